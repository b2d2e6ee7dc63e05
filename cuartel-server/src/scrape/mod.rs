//! Extraction of station data from upstream pages.
//!
//! Station pages don't expose their data directly. Each page embeds:
//! - hidden inputs flagging which volunteers are present, and
//! - a script assigning a signed, short-lived URL for the vehicle data.
//!
//! The vehicle data endpoint returns JSON whose `carros` field holds the
//! vehicles with free-text state labels, which are normalized here.
//!
//! Everything in this module is pure; fetching lives in [`crate::fetch`].

mod error;
mod html;
mod vehicles;

pub use error::ScrapeError;
pub use html::{DEFAULT_DATA_URL_PREFIX, count_personnel, extract_data_url};
pub use vehicles::{classify, parse_vehicles, vehicles_from_value};

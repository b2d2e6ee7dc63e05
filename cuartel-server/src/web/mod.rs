//! Web layer for the station status service.
//!
//! Serves the cached snapshot as JSON. Reads never wait on upstream pages;
//! a stale snapshot is served while a refresh runs in the background.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;

//! HTTP fetcher for station pages.
//!
//! Turns one [`Source`] into one [`StationRecord`]. Every failure is folded
//! into a sentinel record, so callers never see an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, warn};

use crate::domain::{Source, StationRecord, VehicleStatus};
use crate::scrape::{DEFAULT_DATA_URL_PREFIX, count_personnel, extract_data_url, parse_vehicles};

use super::StationFetch;
use super::error::FetchError;

/// Default request timeout, per upstream call.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default maximum number of stations fetched at once.
const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Upstream pages reject clients that don't look like a browser.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Configuration for the station fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum stations fetched concurrently
    pub max_concurrent: usize,
    /// User-Agent header sent upstream
    pub user_agent: String,
    /// Vehicle data endpoint, without query string
    pub data_url_prefix: String,
}

impl FetchConfig {
    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set maximum concurrent station fetches.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the vehicle data endpoint (for testing against a local upstream).
    pub fn with_data_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.data_url_prefix = prefix.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            data_url_prefix: DEFAULT_DATA_URL_PREFIX.to_string(),
        }
    }
}

/// Fetches station pages and their vehicle data.
///
/// Each station gets its own cookie session, since the vehicle data URL is
/// issued to the session that loaded the page. Sessions are built on first
/// use and kept for later refreshes. A semaphore bounds how many stations are
/// in flight at once.
#[derive(Debug, Clone)]
pub struct StationFetcher {
    headers: HeaderMap,
    timeout: Duration,
    data_url_prefix: String,
    semaphore: Arc<Semaphore>,
    sessions: Arc<RwLock<HashMap<String, reqwest::Client>>>,
}

impl StationFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        if config.max_concurrent == 0 {
            return Err(FetchError::InvalidConfig(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|_| {
            FetchError::InvalidConfig(format!("invalid user agent: {:?}", config.user_agent))
        })?;
        headers.insert(USER_AGENT, user_agent);

        let fetcher = Self {
            headers,
            timeout: config.timeout(),
            data_url_prefix: config.data_url_prefix,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        };

        // Fail at startup rather than on every refresh.
        fetcher.session()?;

        Ok(fetcher)
    }

    /// Number of station fetches that may start right now.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of station sessions built so far.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Build a fresh HTTP session with its own cookie store.
    fn session(&self) -> Result<reqwest::Client, FetchError> {
        let client = reqwest::Client::builder()
            .default_headers(self.headers.clone())
            .timeout(self.timeout)
            .cookie_store(true)
            .build()?;
        Ok(client)
    }

    /// The session for a station page, built on first use.
    async fn session_for(&self, url: &str) -> Result<reqwest::Client, FetchError> {
        let cached = self.sessions.read().await.get(url).cloned();
        if let Some(session) = cached {
            return Ok(session);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(url) {
            return Ok(session.clone());
        }

        let session = self.session()?;
        sessions.insert(url.to_string(), session.clone());
        Ok(session)
    }

    /// Find and fetch the vehicle data referenced by a station page.
    async fn fetch_vehicles(
        &self,
        session: &reqwest::Client,
        page: &str,
    ) -> Result<Vec<VehicleStatus>, FetchError> {
        let Some(url) = extract_data_url(page, &self.data_url_prefix) else {
            return Err(FetchError::MissingDataUrl);
        };
        let body = get_text(session, &url).await?;
        Ok(parse_vehicles(&body)?)
    }
}

impl StationFetch for StationFetcher {
    async fn fetch_station(&self, source: &Source) -> StationRecord {
        let session = match self.session_for(&source.url).await {
            Ok(session) => session,
            Err(e) => {
                warn!(station = %source.name, error = %e, "Failed to build HTTP session");
                return StationRecord::unreachable(&source.name);
            }
        };

        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed);
        let _permit = match permit {
            Ok(permit) => permit,
            Err(e) => {
                warn!(station = %source.name, error = %e, "Station fetch skipped");
                return StationRecord::unreachable(&source.name);
            }
        };

        // Status codes are not checked; an error page lacks the data URL and
        // degrades to OFFLINE below.
        let page = match get_text(&session, &source.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    station = %source.name,
                    url = %source.url,
                    error = %e,
                    "Station page unreachable"
                );
                return StationRecord::unreachable(&source.name);
            }
        };

        let personnel = count_personnel(&page);

        match self.fetch_vehicles(&session, &page).await {
            Ok(vehicles) => {
                debug!(
                    station = %source.name,
                    vehicles = vehicles.len(),
                    personnel,
                    "Fetched station"
                );
                StationRecord::new(&source.name, personnel, vehicles)
            }
            Err(e) => {
                warn!(station = %source.name, error = %e, "Vehicle data unavailable");
                StationRecord::offline(&source.name, personnel)
            }
        }
    }
}

async fn get_text(session: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let response = session.get(url).send().await?;
    Ok(response.text().await?)
}

//! Server configuration.
//!
//! Every setting has a default matching the production deployment and can
//! be overridden through `CUARTEL_*` environment variables.

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::domain::{Registry, Source};
use crate::fetch::FetchConfig;

const DEFAULT_PORT: u16 = 5000;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an unusable value
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The sources file could not be read or is malformed
    #[error("invalid sources file {path}: {message}")]
    Registry { path: PathBuf, message: String },
}

/// Configuration for the whole server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Snapshot cache settings
    pub cache: CacheConfig,
    /// Upstream fetch settings
    pub fetch: FetchConfig,
    /// Whether responses include the `personal` field
    pub include_personnel: bool,
    /// JSON file replacing the built-in station list
    pub sources_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            include_personnel: true,
            sources_file: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unset or empty variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = parse_var(&get, "CUARTEL_HOST")? {
            config.host = host;
        }
        if let Some(port) = parse_var(&get, "CUARTEL_PORT")? {
            config.port = port;
        }
        if let Some(secs) = parse_var::<u64>(&get, "CUARTEL_TTL_SECS")? {
            config.cache.ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&get, "CUARTEL_FETCH_TIMEOUT_SECS")? {
            config.fetch.timeout_secs = secs;
        }
        if let Some(n) = parse_var::<usize>(&get, "CUARTEL_MAX_CONCURRENT")? {
            if n == 0 {
                return Err(ConfigError::Invalid {
                    key: "CUARTEL_MAX_CONCURRENT",
                    value: n.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.fetch.max_concurrent = n;
        }
        if let Some(agent) = get("CUARTEL_USER_AGENT") {
            config.fetch.user_agent = agent;
        }
        if let Some(prefix) = get("CUARTEL_DATA_URL_PREFIX") {
            config.fetch.data_url_prefix = prefix;
        }
        if let Some(raw) = get("CUARTEL_INCLUDE_PERSONNEL") {
            config.include_personnel = parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "CUARTEL_INCLUDE_PERSONNEL",
                value: raw.clone(),
                reason: "expected true or false".to_string(),
            })?;
        }
        if let Some(path) = get("CUARTEL_SOURCES_FILE") {
            config.sources_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    pub fn with_include_personnel(mut self, include: bool) -> Self {
        self.include_personnel = include;
        self
    }

    pub fn with_sources_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources_file = Some(path.into());
        self
    }

    /// Socket address to bind.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The station list: the sources file if configured, else the built-in one.
    pub fn load_registry(&self) -> Result<Registry, ConfigError> {
        match &self.sources_file {
            Some(path) => load_registry_file(path),
            None => Ok(Registry::default()),
        }
    }
}

/// Read a station list from a JSON file of `{"nombre", "url"}` objects.
pub fn load_registry_file(path: &Path) -> Result<Registry, ConfigError> {
    let registry_error = |message: String| ConfigError::Registry {
        path: path.to_path_buf(),
        message,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| registry_error(e.to_string()))?;
    let sources: Vec<Source> =
        serde_json::from_str(&contents).map_err(|e| registry_error(e.to_string()))?;

    if sources.is_empty() {
        return Err(registry_error("no sources listed".to_string()));
    }

    Ok(Registry::new(sources))
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = get(key) else {
        return Ok(None);
    };

    match raw.trim().parse() {
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: format!("{e}"),
            value: raw,
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

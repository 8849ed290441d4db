//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `AUTOPARTS_API_URL` - Base URL of the REST API (default: <http://localhost:8080>)
//! - `AUTOPARTS_SESSION_FILE` - Where the session is persisted (default: platform data dir)
//! - `AUTOPARTS_HTTP_TIMEOUT_SECS` - Transport-level request timeout (default: 30)
//! - `AUTOPARTS_CATALOG_CACHE_TTL_SECS` - Product cache lifetime (default: 300)

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;
const SESSION_FILE_NAME: &str = "session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API; image references resolve under `<api_url>/uploads/`
    pub api_url: Url,
    /// Persisted session file
    pub session_file: PathBuf,
    /// Timeout applied to every outbound request
    pub http_timeout: Duration,
    /// How long catalog responses stay cached
    pub catalog_cache_ttl: Duration,
}

impl ClientConfig {
    /// Configuration pointing at `api_url` with every other setting defaulted.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            session_file: default_session_file(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url_raw = lookup("AUTOPARTS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(api_url_raw.trim()).map_err(|e| {
            ConfigError::InvalidEnvVar("AUTOPARTS_API_URL".to_string(), e.to_string())
        })?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "AUTOPARTS_API_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let session_file = lookup("AUTOPARTS_SESSION_FILE")
            .filter(|p| !p.trim().is_empty())
            .map_or_else(default_session_file, PathBuf::from);

        let http_timeout = parse_secs(
            "AUTOPARTS_HTTP_TIMEOUT_SECS",
            lookup("AUTOPARTS_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;
        let catalog_cache_ttl = parse_secs(
            "AUTOPARTS_CATALOG_CACHE_TTL_SECS",
            lookup("AUTOPARTS_CATALOG_CACHE_TTL_SECS"),
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?;

        Ok(Self {
            api_url,
            session_file,
            http_timeout,
            catalog_cache_ttl,
        })
    }

    /// API base URL without a trailing slash, for building endpoint paths.
    #[must_use]
    pub fn api_base(&self) -> &str {
        self.api_url.as_str().trim_end_matches('/')
    }
}

/// Platform data directory, or the working directory if none can be determined.
fn default_session_file() -> PathBuf {
    ProjectDirs::from("com", "Autoparts", "autoparts").map_or_else(
        || PathBuf::from(format!(".autoparts-{SESSION_FILE_NAME}")),
        |dirs| dirs.data_dir().join(SESSION_FILE_NAME),
    )
}

fn parse_secs(key: &str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default));
    };
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

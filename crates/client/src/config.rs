//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `SNEAKERSHELF_API_BASE_URL` - Backend API root (default: `http://127.0.0.1:8000/api`)
//! - `SNEAKERSHELF_SESSION_FILE` - Where to persist identity and session cookies
//! - `SNEAKERSHELF_CART_ORDERING` - `serialized` (default) or `last_response_wins`
//! - `SNEAKERSHELF_REQUEST_TIMEOUT_SECS` - Transport timeout in seconds (default: none)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How concurrent cart mutations are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartOrdering {
    /// One mutation in flight per cart; later calls wait their turn.
    #[default]
    Serialized,
    /// Mutations run independently and the last response to arrive
    /// replaces the cart, even if it was issued first.
    LastResponseWins,
}

impl FromStr for CartOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serialized" => Ok(Self::Serialized),
            "last_response_wins" | "last-response-wins" => Ok(Self::LastResponseWins),
            other => Err(format!(
                "expected `serialized` or `last_response_wins`, got `{other}`"
            )),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the backend API; every endpoint is resolved beneath it.
    pub api_base_url: Url,
    /// File holding the persisted identity and session cookies.
    pub session_file: Option<PathBuf>,
    /// Ordering policy for cart mutations.
    pub cart_ordering: CartOrdering,
    /// Transport timeout. `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Configuration pointing at the given API root with all defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is not an absolute http(s) URL.
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url("api_base_url", api_base_url)?,
            session_file: None,
            cart_ordering: CartOrdering::default(),
            request_timeout: None,
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup("SNEAKERSHELF_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url("SNEAKERSHELF_API_BASE_URL", &base)?;

        let session_file = lookup("SNEAKERSHELF_SESSION_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cart_ordering = match lookup("SNEAKERSHELF_CART_ORDERING") {
            Some(raw) => raw.parse::<CartOrdering>().map_err(|e| {
                ConfigError::InvalidEnvVar("SNEAKERSHELF_CART_ORDERING".to_string(), e)
            })?,
            None => CartOrdering::default(),
        };

        let request_timeout = match lookup("SNEAKERSHELF_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };

        Ok(Self {
            api_base_url,
            session_file,
            cart_ordering,
            request_timeout,
            sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|s| !s.is_empty()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the API root.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute URL with a host".to_string(),
        ));
    }

    Ok(url)
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let key = "SNEAKERSHELF_REQUEST_TIMEOUT_SECS";
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

//! Supervisor configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use flogo_live::SupervisorConfig;
//!
//! let config = SupervisorConfig::new()
//!     .with_endpoint("http://127.0.0.1:3000/.flogo/events")
//!     .with_max_delay(Duration::from_secs(10))
//!     .with_max_retries(5);
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Environment
//!
//! | Variable | Field |
//! |----------|-------|
//! | `FLOGO_EVENTS_URL` | `endpoint` |
//! | `FLOGO_BASE_DELAY_MS` | `base_delay` |
//! | `FLOGO_MAX_DELAY_MS` | `max_delay` |
//! | `FLOGO_MAX_RETRIES` | `max_retries` |

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::backoff::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Path of the event stream on the development server.
pub const EVENTS_PATH: &str = "/.flogo/events";

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/.flogo/events";

// ============================================================================
// SupervisorConfig
// ============================================================================

/// Settings for a [`StreamSupervisor`](crate::StreamSupervisor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Full URL of the event stream.
    pub endpoint: String,

    /// Delay before the first reconnect attempt.
    #[serde(with = "millis")]
    pub base_delay: Duration,

    /// Cap on any single reconnect delay.
    #[serde(with = "millis")]
    pub max_delay: Duration,

    /// Consecutive failures tolerated before giving up (`None` = never).
    pub max_retries: Option<u32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SupervisorConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_retries: None,
        }
    }

    /// Loads configuration from `FLOGO_*` environment variables.
    ///
    /// Unset or unparsable variables fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::new();

        Self {
            endpoint: env::var("FLOGO_EVENTS_URL").unwrap_or(defaults.endpoint),
            base_delay: env_millis("FLOGO_BASE_DELAY_MS").unwrap_or(defaults.base_delay),
            max_delay: env_millis("FLOGO_MAX_DELAY_MS").unwrap_or(defaults.max_delay),
            max_retries: env::var("FLOGO_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SupervisorConfig {
    /// Sets the event stream URL.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the event stream URL from a server base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `base` is not a valid URL.
    pub fn with_server(self, base: &str) -> Result<Self> {
        let url = events_url(base)?;
        Ok(self.with_endpoint(url.as_str()))
    }

    /// Sets the first reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the reconnect delay cap.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets a finite retry ceiling.
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SupervisorConfig {
    /// Checks the configuration and returns the parsed endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is unparsable or not HTTP(S)
    /// - [`Error::Config`] if `base_delay` is zero
    /// - [`Error::Config`] if `max_delay` is below `base_delay`
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| Error::config(format!("invalid endpoint {:?}: {e}", self.endpoint)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "endpoint must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.base_delay.is_zero() {
            return Err(Error::config("base delay must be greater than zero"));
        }

        if self.max_delay < self.base_delay {
            return Err(Error::config(format!(
                "max delay ({}ms) is below base delay ({}ms)",
                self.max_delay.as_millis(),
                self.base_delay.as_millis()
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Joins the fixed event stream path onto a server base URL.
///
/// # Errors
///
/// Returns [`Error::Url`] if `base` is not a valid URL.
pub fn events_url(base: &str) -> Result<Url> {
    let base = Url::parse(base)?;
    Ok(base.join(EVENTS_PATH)?)
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

/// Serializes durations as integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Error types for the live-status client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use flogo_live::{Result, StatusDisplay, TerminalSurface};
//!
//! fn example() -> Result<()> {
//!     let display = StatusDisplay::new(Some(TerminalSurface::stderr()))?;
//!     display.show_building(None);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::Transport`], [`Error::ConnectionClosed`] |
//! | Terminal | [`Error::RetriesExhausted`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Url`], [`Error::Http`] |
//!
//! Transport errors never leave the supervisor: they are folded into the
//! retry path. Configuration errors are returned to whoever constructed
//! the failing component.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a component is built without a mount point, or
    /// when supervisor settings are invalid. Never retried.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Event stream failure.
    ///
    /// Returned when the stream cannot be opened or breaks mid-flight.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// Event stream ended by the server.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Terminal Errors
    // ========================================================================
    /// Retry ceiling reached.
    ///
    /// Only possible when a finite ceiling is configured.
    #[error("Connection failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of consecutive failed attempts.
        attempts: u32,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a retries exhausted error.
    #[inline]
    pub fn retries_exhausted(attempts: u32) -> Self {
        Self::RetriesExhausted { attempts }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Url(_))
    }

    /// Returns `true` if this error came from the event stream.
    ///
    /// Transport errors are always retried by the supervisor.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::ConnectionClosed | Self::Http(_) | Self::Io(_)
        )
    }

    /// Returns `true` if no automatic recovery follows this error.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. } | Self::Config { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

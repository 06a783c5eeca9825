//! Flogo Live - build status client for development servers.
//!
//! This library keeps a long-lived event stream to a development server
//! open and turns what it hears into a compact build status indicator.
//!
//! # Architecture
//!
//! The client follows a supervisor/presenter split:
//!
//! - **Supervisor**: Owns the connection, reconnects with bounded
//!   exponential backoff, and ignores callbacks from superseded attempts
//! - **Presenter**: Renders `Fine`, `Building`, or `Error` with an optional
//!   detail panel, and skips repaints that would change nothing
//!
//! Key design principles:
//!
//! - At most one live connection and at most one pending retry timer
//! - Transport is a trait; [`SseTransport`] is the HTTP implementation
//! - Surface is a trait; [`TerminalSurface`] draws on stderr
//!
//! # Quick Start
//!
//! ```no_run
//! use flogo_live::{LiveStatus, Result, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SupervisorConfig::new().with_server("http://127.0.0.1:8080")?;
//!     let live = LiveStatus::terminal(config)?;
//!
//!     live.run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`backoff`] | Reconnect delay schedule |
//! | [`client`] | [`LiveStatus`] composition root |
//! | [`config`] | [`SupervisorConfig`] and environment loading |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`presenter`] | Status display and rendering surfaces |
//! | [`protocol`] | Stream messages and the SSE decoder |
//! | [`supervisor`] | [`StreamSupervisor`] lifecycle state machine |
//! | [`transport`] | Transport trait and HTTP implementation |

// ============================================================================
// Modules
// ============================================================================

/// Reconnect delay schedule.
pub mod backoff;

/// Composition root wiring a display to a supervisor.
pub mod client;

/// Supervisor configuration.
///
/// Use [`SupervisorConfig::from_env()`] to pick up `FLOGO_*` overrides.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Status presentation.
pub mod presenter;

/// Event stream message types.
pub mod protocol;

/// Connection lifecycle supervision.
pub mod supervisor;

/// Event stream transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client
pub use client::LiveStatus;

// Configuration
pub use config::SupervisorConfig;

// Error types
pub use error::{Error, Result};

// Presentation
pub use presenter::{
    ErrorDetail, Palette, PresentationState, Presenter, StatusDisplay, Status, Surface,
    TerminalSurface, View,
};

// Protocol
pub use protocol::{SseDecoder, StreamMessage};

// Supervision
pub use supervisor::{ConnectionSnapshot, Phase, StreamSupervisor};

// Transport
pub use transport::{EventSink, SseTransport, Transport, TransportEvent, TransportHandle};

//! Connection lifecycle supervision.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StreamSupervisor`] | Owns the connection and reconnect timer |
//! | [`Phase`] | Lifecycle phase |
//! | [`ConnectionSnapshot`] | Read-only copy of the lifecycle state |

// ============================================================================
// Submodules
// ============================================================================

/// Supervisor implementation.
pub mod core;

/// Lifecycle state types.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{CONNECTING_MESSAGE, FAILED_MESSAGE, MessageHandler, StreamSupervisor};
pub use state::{ConnectionSnapshot, Phase};

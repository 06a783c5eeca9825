//! Event stream message types and wire decoding.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | [`StreamMessage`], the unit delivered to the supervisor |
//! | `sse` | [`SseDecoder`], incremental `text/event-stream` parser |

// ============================================================================
// Submodules
// ============================================================================

/// Stream message type.
pub mod message;

/// Server-sent events decoder.
pub mod sse;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{CONNECTED_EVENT, StreamMessage};
pub use sse::{DEFAULT_MAX_LINE, SseDecoder};

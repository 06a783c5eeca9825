//! Event stream transport layer.
//!
//! The supervisor never builds a concrete stream. It is handed a
//! [`Transport`] that opens connections and reports back through an
//! [`EventSink`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   open(url, sink)   ┌──────────────────┐
//! │ StreamSupervisor │────────────────────►│    Transport     │
//! │                  │◄────────────────────│  (SseTransport)  │
//! │                  │   TransportEvent    │                  │
//! └──────────────────┘                     └────────┬─────────┘
//!                                                   │ HTTP GET
//!                                                   ▼
//!                                          /.flogo/events
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `sse` | HTTP server-sent events transport (reqwest) |

// ============================================================================
// Submodules
// ============================================================================

/// Server-sent events transport.
pub mod sse;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use url::Url;

use crate::protocol::StreamMessage;

// ============================================================================
// Re-exports
// ============================================================================

pub use sse::SseTransport;

// ============================================================================
// Types
// ============================================================================

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The stream is open and delivering events.
    Open,
    /// A named or unnamed event arrived.
    Message(StreamMessage),
    /// The stream failed or ended. No further events follow.
    Error(String),
}

/// Callback receiving a transport's events, in delivery order.
///
/// May be called from any thread, with or without a Tokio runtime.
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

// ============================================================================
// Traits
// ============================================================================

/// A live transport connection.
pub trait TransportHandle: Send {
    /// Releases the connection. Idempotent.
    ///
    /// The sink may still observe an event already in flight.
    fn close(&mut self);
}

/// Opens transport connections.
pub trait Transport: Send + Sync {
    /// Starts connecting to `endpoint`, reporting through `sink`.
    ///
    /// Must return without waiting for the connection to open.
    fn open(&self, endpoint: &Url, sink: EventSink) -> Box<dyn TransportHandle>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn open(&self, endpoint: &Url, sink: EventSink) -> Box<dyn TransportHandle> {
        (**self).open(endpoint, sink)
    }
}

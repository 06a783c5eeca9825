//! Messages delivered by the event stream.
//!
//! Bodies are opaque. The only inspection performed is a best-effort
//! peek at a JSON `type` field so log lines can be labelled.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Name of the event the server sends right after a stream opens.
pub const CONNECTED_EVENT: &str = "connected";

// ============================================================================
// StreamMessage
// ============================================================================

/// A single dispatched stream event.
///
/// # Wire Format
///
/// ```text
/// event: connected
/// data: {"status": "connected", "time": "2024-01-01T00:00:00Z"}
///
/// data: {"type": "heartbeat", "content": {"time": "..."}}
///
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Event name, `None` for the default (unnamed) event.
    pub event: Option<String>,

    /// Payload, multi-line data joined with `\n`.
    pub data: String,

    /// Last event ID seen on the stream, if any.
    pub id: Option<String>,
}

impl StreamMessage {
    /// Creates an unnamed message.
    #[inline]
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
            id: None,
        }
    }

    /// Creates a named message.
    #[inline]
    #[must_use]
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
            id: None,
        }
    }

    /// Returns the event name, `"message"` for unnamed events.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    /// Returns `true` for the server's `connected` greeting.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.event.as_deref() == Some(CONNECTED_EVENT)
    }

    /// Parses the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload is not JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.data)?)
    }

    /// Returns the payload's JSON `type` field, if it has one.
    ///
    /// Used to label log lines only.
    #[must_use]
    pub fn kind(&self) -> Option<String> {
        let value = self.json().ok()?;
        value.get("type")?.as_str().map(str::to_owned)
    }
}

// ============================================================================
// Tests
// ============================================================================

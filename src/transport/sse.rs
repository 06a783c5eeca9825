//! HTTP server-sent events transport.
//!
//! Each [`SseTransport::open`] spawns one reader task that issues a
//! `GET` with `Accept: text/event-stream` and feeds the body through an
//! [`SseDecoder`]. Closing the handle aborts the task.
//!
//! Each request carries the last event ID seen by an earlier stream as
//! `Last-Event-ID`, so the server can resume where the previous
//! connection stopped.
//!
//! # Event Order
//!
//! 1. `Open` once a 2xx `text/event-stream` response arrives
//! 2. `Message` for every decoded event
//! 3. exactly one `Error` when the request fails, the response is
//!    rejected, the body breaks, or the server ends the stream

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, HeaderName};
use tokio::task::AbortHandle;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::SseDecoder;

use super::{EventSink, Transport, TransportEvent, TransportHandle};

// ============================================================================
// Constants
// ============================================================================

/// Expected response media type.
const EVENT_STREAM: &str = "text/event-stream";

/// Resume header.
const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

// ============================================================================
// SseTransport
// ============================================================================

/// Opens server-sent event streams over HTTP.
///
/// Requires a running Tokio runtime when [`Transport::open`] is called.
/// Clones share the resume position.
#[derive(Clone, Default)]
pub struct SseTransport {
    client: Client,
    /// Last event ID seen on any stream opened by this transport.
    last_event_id: Arc<Mutex<Option<String>>>,
}

impl fmt::Debug for SseTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseTransport")
            .field("last_event_id", &*self.last_event_id.lock())
            .finish_non_exhaustive()
    }
}

impl SseTransport {
    /// Creates a transport with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client))
    }

    /// Creates a transport sharing an existing client.
    #[inline]
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            last_event_id: Arc::default(),
        }
    }

    /// Returns the ID the next stream will resume from.
    #[must_use]
    pub fn last_event_id(&self) -> Option<String> {
        self.last_event_id.lock().clone()
    }

    /// Reader task body.
    async fn run(self, endpoint: Url, sink: EventSink) {
        let reason = match self.read_stream(&endpoint, &sink).await {
            Ok(()) => Error::ConnectionClosed.to_string(),
            Err(e) => e.to_string(),
        };

        debug!(%endpoint, %reason, "Event stream ended");
        sink(TransportEvent::Error(reason));
    }

    /// Connects and forwards events until the body ends.
    async fn read_stream(&self, endpoint: &Url, sink: &EventSink) -> Result<()> {
        let mut request = self
            .client
            .get(endpoint.clone())
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = self.last_event_id() {
            debug!(last_event_id = %id, "Resuming event stream");
            request = request.header(LAST_EVENT_ID, id);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!("unexpected status {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with(EVENT_STREAM) {
            return Err(Error::transport(format!(
                "unexpected content type {content_type:?}"
            )));
        }

        sink(TransportEvent::Open);

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            trace!(len = chunk.len(), "SSE chunk received");

            let messages = decoder.push(&chunk)?;
            if !messages.is_empty()
                && let Some(id) = decoder.last_event_id()
            {
                *self.last_event_id.lock() = Some(id.to_owned());
            }

            for message in messages {
                sink(TransportEvent::Message(message));
            }
        }

        Ok(())
    }
}

impl Transport for SseTransport {
    fn open(&self, endpoint: &Url, sink: EventSink) -> Box<dyn TransportHandle> {
        debug!(%endpoint, "Opening event stream");
        let task = tokio::spawn(self.clone().run(endpoint.clone(), sink));

        Box::new(SseHandle {
            task: Some(task.abort_handle()),
        })
    }
}

// ============================================================================
// SseHandle
// ============================================================================

/// Handle to a running reader task.
struct SseHandle {
    task: Option<AbortHandle>,
}

impl TransportHandle for SseHandle {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            trace!("Event stream reader aborted");
        }
    }
}

impl Drop for SseHandle {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Incremental server-sent events decoder.
//!
//! Feed raw body chunks with [`SseDecoder::push`]; complete events come
//! back as [`StreamMessage`]s. Chunk boundaries may fall anywhere,
//! including inside a UTF-8 sequence or between `\r` and `\n`.
//!
//! A line longer than the decoder's limit fails the stream instead of
//! buffering without bound.
//!
//! # Field Handling
//!
//! | Line | Effect |
//! |------|--------|
//! | `data: x` | append `x` to the data buffer |
//! | `event: x` | set the event name |
//! | `id: x` | set the last event ID |
//! | `retry: n` | ignored, reconnect timing is the supervisor's |
//! | `: x` | comment, ignored |
//! | *(blank)* | dispatch |

// ============================================================================
// Imports
// ============================================================================

use std::mem;

use tracing::trace;

use crate::error::{Error, Result};

use super::message::StreamMessage;

// ============================================================================
// Constants
// ============================================================================

/// Default longest accepted line, in bytes.
pub const DEFAULT_MAX_LINE: usize = 1024 * 1024;

// ============================================================================
// SseDecoder
// ============================================================================

/// Stateful decoder for a single stream.
#[derive(Debug)]
pub struct SseDecoder {
    /// Bytes not yet terminated by a line ending.
    buffer: Vec<u8>,
    /// Longest accepted line.
    max_line: usize,
    /// Previous chunk ended with `\r`; a leading `\n` belongs to it.
    pending_cr: bool,
    /// Whether the BOM check has run.
    started: bool,
    /// Data lines of the event being built.
    data: Vec<String>,
    /// Name of the event being built.
    event: Option<String>,
    /// Last event ID, persists across events.
    last_id: Option<String>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE)
    }
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty decoder accepting lines up to `max_line` bytes.
    #[must_use]
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            pending_cr: false,
            started: false,
            data: Vec::new(),
            event: None,
            last_id: None,
        }
    }

    /// Returns the last event ID seen.
    #[inline]
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Decodes a chunk, returning every event it completes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if a line exceeds the limit. The
    /// partial line is discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamMessage>> {
        let mut out = Vec::new();
        let mut chunk = chunk;

        if self.pending_cr {
            self.pending_cr = false;
            if let Some(rest) = chunk.strip_prefix(b"\n") {
                chunk = rest;
            }
        }

        let mut start = 0;
        let mut i = 0;
        while i < chunk.len() {
            match chunk[i] {
                b'\n' => {
                    self.buffer_bytes(&chunk[start..i])?;
                    self.take_line(&mut out);
                    i += 1;
                    start = i;
                }
                b'\r' => {
                    self.buffer_bytes(&chunk[start..i])?;
                    self.take_line(&mut out);
                    i += 1;
                    if i == chunk.len() {
                        self.pending_cr = true;
                    } else if chunk[i] == b'\n' {
                        i += 1;
                    }
                    start = i;
                }
                _ => i += 1,
            }
        }
        self.buffer_bytes(&chunk[start..])?;

        Ok(out)
    }

    /// Appends to the current line, enforcing the length limit.
    fn buffer_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buffer.len() + bytes.len() > self.max_line {
            self.buffer.clear();
            return Err(Error::transport(format!(
                "SSE line exceeds {} bytes",
                self.max_line
            )));
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Processes the buffered line.
    fn take_line(&mut self, out: &mut Vec<StreamMessage>) {
        let raw = mem::take(&mut self.buffer);
        let mut line = String::from_utf8_lossy(&raw).into_owned();

        if !self.started {
            self.started = true;
            if let Some(rest) = line.strip_prefix('\u{feff}') {
                line = rest.to_owned();
            }
        }

        if line.is_empty() {
            if let Some(message) = self.dispatch() {
                out.push(message);
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "data" => self.data.push(value.to_owned()),
            "event" => self.event = Some(value.to_owned()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            "retry" => trace!(value, "Ignoring SSE retry hint"),
            _ => trace!(field, "Ignoring unknown SSE field"),
        }
    }

    /// Builds the pending event, if it carries data.
    fn dispatch(&mut self) -> Option<StreamMessage> {
        let event = self.event.take();

        if self.data.is_empty() {
            return None;
        }

        let data = mem::take(&mut self.data).join("\n");
        let event = event.filter(|name| !name.is_empty() && name != "message");

        trace!(event = ?event, len = data.len(), "SSE event decoded");

        Some(StreamMessage {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

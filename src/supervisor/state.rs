//! Connection lifecycle state.
//!
//! Owned exclusively by the supervisor. Two invariants hold whenever the
//! supervisor's lock is released:
//!
//! - `pending_retry` is `Some` iff `phase == Reconnecting`
//! - at most one transport handle is live

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::transport::TransportHandle;

// ============================================================================
// Phase
// ============================================================================

/// Lifecycle phase of the supervised connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Not supervising.
    #[default]
    Idle,
    /// Transport requested, not yet open.
    Connecting,
    /// Transport open and delivering.
    Open,
    /// Waiting for the retry timer.
    Reconnecting,
    /// Retry ceiling reached; needs a manual `start()`.
    Failed,
}

impl Phase {
    /// Returns the lowercase phase name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` while the supervisor is actively working.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Reconnecting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Internal Types
// ============================================================================

/// The single scheduled retry.
pub(crate) struct RetryTimer {
    /// Matches the token captured by the timer task.
    pub token: u64,
    pub task: AbortHandle,
}

/// Why the supervisor stopped retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    /// Retry ceiling reached after this many consecutive failures.
    RetriesExhausted(u32),
    /// No runtime to arm the retry timer on.
    NoRuntime,
}

/// The current transport attempt.
pub(crate) struct ActiveConnection {
    /// Captured by the attempt's event sink.
    pub generation: u64,
    /// `None` until `Transport::open` returns.
    pub handle: Option<Box<dyn TransportHandle>>,
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Mutable supervisor state.
#[derive(Default)]
pub(crate) struct ConnectionState {
    pub phase: Phase,
    /// Consecutive failures since the last successful open.
    pub retry_count: u32,
    pub pending_retry: Option<RetryTimer>,
    pub active: Option<ActiveConnection>,
    /// Last generation handed out.
    pub generation: u64,
    /// Last timer token handed out.
    pub timer_seq: u64,
    /// Runtime the retry timers run on.
    pub runtime: Option<Handle>,
    /// Set while `phase == Failed`.
    pub failure: Option<Failure>,
}

impl ConnectionState {
    /// Returns `true` if `generation` belongs to the live attempt.
    #[inline]
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    /// Allocates a generation for a new attempt and makes it current.
    ///
    /// Returns the previous handle, which the caller must close.
    pub fn begin_attempt(&mut self) -> (u64, Option<Box<dyn TransportHandle>>) {
        let previous = self.release_connection();
        self.generation += 1;
        self.active = Some(ActiveConnection {
            generation: self.generation,
            handle: None,
        });
        self.phase = Phase::Connecting;
        self.failure = None;
        (self.generation, previous)
    }

    /// Detaches the live attempt, returning its handle for closing.
    pub fn release_connection(&mut self) -> Option<Box<dyn TransportHandle>> {
        self.active.take().and_then(|active| active.handle)
    }

    /// Takes the pending retry timer, if any.
    pub fn take_retry(&mut self) -> Option<RetryTimer> {
        self.pending_retry.take()
    }

    /// Allocates a timer token.
    pub fn next_timer_token(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    /// Returns a read-only copy for callers.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            phase: self.phase,
            retry_count: self.retry_count,
            retry_pending: self.pending_retry.is_some(),
            connection_live: self.active.is_some(),
        }
    }
}

// ============================================================================
// ConnectionSnapshot
// ============================================================================

/// Point-in-time view of the supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Consecutive failures since the last successful open.
    pub retry_count: u32,
    /// Whether a retry timer is armed.
    pub retry_pending: bool,
    /// Whether a transport attempt is live.
    pub connection_live: bool,
}

// ============================================================================
// Tests
// ============================================================================

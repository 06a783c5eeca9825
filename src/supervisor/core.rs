//! Stream supervisor: connection lifecycle and reconnect scheduling.
//!
//! # Lifecycle
//!
//! ```text
//!            start()
//!   Idle ─────────────► Connecting ──on open──► Open
//!    ▲                    ▲    │                  │
//!    │ stop()             │    └────on error──────┤
//!    │            timer   │                       ▼
//!    └──────────────── Reconnecting ◄──── schedule retry
//!                                                 │ ceiling reached
//!                                                 ▼
//!                                               Failed
//! ```
//!
//! Every attempt gets a fresh generation number that its event sink
//! captures. Events whose generation is no longer current are dropped,
//! so a dead connection can never reopen a stopped supervisor or arm a
//! second retry.
//!
//! Sinks may fire from any thread. Retry timers run on the runtime
//! captured by [`StreamSupervisor::new`], or by the first
//! [`StreamSupervisor::start`] if `new()` ran outside one.
//! The presenter, the transport, and the message handler are always
//! called with the state lock released.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::backoff::{countdown_message, delay_for};
use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use crate::presenter::Presenter;
use crate::protocol::StreamMessage;
use crate::transport::{EventSink, Transport, TransportEvent, TransportHandle};

use super::state::{ConnectionSnapshot, ConnectionState, Failure, Phase, RetryTimer};

// ============================================================================
// Constants
// ============================================================================

/// Status shown while a connection attempt is in flight.
pub const CONNECTING_MESSAGE: &str = "Compiling...";

/// Status shown once the retry ceiling is reached.
pub const FAILED_MESSAGE: &str = "Connection failed";

// ============================================================================
// Types
// ============================================================================

/// Application hook for received messages.
///
/// Runs outside the supervisor lock and may call into the presenter,
/// e.g. `presenter.hide()` on a "ready" signal.
pub type MessageHandler = Box<dyn Fn(&StreamMessage, &dyn Presenter) + Send + Sync>;

/// Shared state reachable from transport sinks and timer tasks.
struct SupervisorInner {
    endpoint: Url,
    config: SupervisorConfig,
    presenter: Arc<dyn Presenter>,
    transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
    message_handler: RwLock<Option<MessageHandler>>,
}

// ============================================================================
// StreamSupervisor
// ============================================================================

/// Keeps at most one event stream alive and reconnects with backoff.
///
/// Status is reported through the injected [`Presenter`]. Connections
/// come from the injected [`Transport`].
///
/// Reconnect timers are Tokio tasks. The runtime is taken from the
/// caller of `new()` or `start()`, or set with
/// [`with_runtime`](Self::with_runtime). Dropping the supervisor stops it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use flogo_live::{
///     SseTransport, StatusDisplay, StreamSupervisor, SupervisorConfig, TerminalSurface,
/// };
///
/// # async fn example() -> flogo_live::Result<()> {
/// let display = Arc::new(StatusDisplay::new(Some(TerminalSurface::stderr()))?);
/// let supervisor = StreamSupervisor::new(
///     SupervisorConfig::from_env(),
///     display,
///     Arc::new(SseTransport::new()?),
/// )?;
///
/// supervisor.start();
/// tokio::signal::ctrl_c().await?;
/// supervisor.stop();
/// # Ok(())
/// # }
/// ```
pub struct StreamSupervisor {
    inner: Arc<SupervisorInner>,
}

impl fmt::Debug for StreamSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSupervisor")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StreamSupervisor - Public API
// ============================================================================

impl StreamSupervisor {
    /// Creates an idle supervisor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `config` is invalid.
    pub fn new(
        config: SupervisorConfig,
        presenter: Arc<dyn Presenter>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let endpoint = config.validate()?;
        let state = ConnectionState {
            runtime: Handle::try_current().ok(),
            ..ConnectionState::default()
        };

        Ok(Self {
            inner: Arc::new(SupervisorInner {
                endpoint,
                config,
                presenter,
                transport,
                state: Mutex::new(state),
                message_handler: RwLock::new(None),
            }),
        })
    }

    /// Installs a hook called for every current message.
    #[must_use]
    pub fn with_message_handler(
        self,
        handler: impl Fn(&StreamMessage, &dyn Presenter) + Send + Sync + 'static,
    ) -> Self {
        *self.inner.message_handler.write() = Some(Box::new(handler));
        self
    }

    /// Runs retry timers on `runtime`.
    #[must_use]
    pub fn with_runtime(self, runtime: Handle) -> Self {
        self.inner.state.lock().runtime = Some(runtime);
        self
    }

    /// Starts supervising.
    ///
    /// No-op while connecting, open, or waiting to reconnect. From
    /// `Idle` or `Failed` it begins a fresh session with a zero retry
    /// count.
    pub fn start(&self) {
        let (generation, previous) = {
            let mut state = self.inner.state.lock();
            if state.phase.is_active() {
                debug!(phase = %state.phase, "start() ignored, already supervising");
                return;
            }

            info!(endpoint = %self.inner.endpoint, "Starting event stream supervision");
            if state.runtime.is_none() {
                state.runtime = Handle::try_current().ok();
            }
            state.retry_count = 0;
            state.begin_attempt()
        };

        self.inner.open_attempt(generation, previous);
    }

    /// Stops supervising.
    ///
    /// Cancels the pending retry and closes the live transport, if any.
    /// Safe to call repeatedly and from any phase.
    pub fn stop(&self) {
        let (timer, handle, was) = {
            let mut state = self.inner.state.lock();
            let was = state.phase;
            let timer = state.take_retry();
            let handle = state.release_connection();
            state.phase = Phase::Idle;
            state.failure = None;
            (timer, handle, was)
        };

        if let Some(timer) = timer {
            timer.task.abort();
        }
        if let Some(mut handle) = handle {
            handle.close();
        }

        if was != Phase::Idle {
            info!(from = %was, "Event stream supervision stopped");
        }
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase
    }

    /// Returns the consecutive failure count.
    #[inline]
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.inner.state.lock().retry_count
    }

    /// Returns why supervision gave up, while the phase is `Failed`.
    #[must_use]
    pub fn failure(&self) -> Option<Error> {
        self.inner.state.lock().failure.map(Failure::into_error)
    }

    /// Returns a copy of the lifecycle state.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Returns the stream endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }
}

impl Drop for StreamSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// SupervisorInner - Transitions
// ============================================================================

impl SupervisorInner {
    /// Shows progress and opens the transport for `generation`.
    /// Called without the lock.
    fn open_attempt(
        self: &Arc<Self>,
        generation: u64,
        previous: Option<Box<dyn TransportHandle>>,
    ) {
        if let Some(mut previous) = previous {
            previous.close();
        }

        self.presenter.show_building(Some(CONNECTING_MESSAGE));

        debug!(generation, "Opening transport");
        let mut handle = self.transport.open(&self.endpoint, self.sink(generation));

        {
            let mut state = self.state.lock();
            if let Some(active) = state.active.as_mut()
                && active.generation == generation
            {
                active.handle = Some(handle);
                return;
            }
        }

        debug!(generation, "Attempt superseded while opening, closing handle");
        handle.close();
    }

    /// Builds the sink for one attempt.
    fn sink(self: &Arc<Self>, generation: u64) -> EventSink {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |event: TransportEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(generation, event);
            }
        })
    }

    fn handle_event(self: &Arc<Self>, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_open(generation),
            TransportEvent::Message(message) => self.on_message(generation, message),
            TransportEvent::Error(reason) => self.on_error(generation, &reason),
        }
    }

    fn on_open(&self, generation: u64) {
        let mut state = self.state.lock();
        if !state.is_current(generation) {
            debug!(generation, "Ignoring stale open");
            return;
        }

        state.retry_count = 0;
        state.phase = Phase::Open;
        info!(endpoint = %self.endpoint, generation, "Event stream connection established");
    }

    fn on_message(&self, generation: u64, message: StreamMessage) {
        if !self.state.lock().is_current(generation) {
            debug!(generation, "Ignoring stale message");
            return;
        }

        if message.is_connected() {
            info!(data = %message.data, "Connected event received");
        } else {
            let kind = message.kind();
            debug!(
                event = message.event_name(),
                kind = kind.as_deref().unwrap_or("-"),
                data = %message.data,
                "Message received"
            );
        }

        if let Some(handler) = self.message_handler.read().as_ref() {
            handler(&message, self.presenter.as_ref());
        }
    }

    fn on_error(self: &Arc<Self>, generation: u64, reason: &str) {
        let (handle, status) = {
            let mut state = self.state.lock();
            if !state.is_current(generation) {
                debug!(generation, error = reason, "Ignoring stale transport error");
                return;
            }

            warn!(generation, error = reason, "Event stream error");
            let handle = state.release_connection();
            state.phase = Phase::Reconnecting;
            (handle, self.schedule_retry(&mut state))
        };

        if let Some(mut handle) = handle {
            handle.close();
        }
        self.presenter.show_building(Some(&status));
    }

    /// Arms the retry timer, or gives up at the ceiling. Caller holds the lock.
    ///
    /// Returns the status line to show once the lock is released.
    fn schedule_retry(self: &Arc<Self>, state: &mut ConnectionState) -> String {
        if let Some(timer) = state.take_retry() {
            timer.task.abort();
        }

        if let Some(max) = self.config.max_retries
            && state.retry_count >= max
        {
            let attempts = state.retry_count;
            return Self::fail(state, Failure::RetriesExhausted(attempts));
        }

        let Some(runtime) = state.runtime.clone() else {
            return Self::fail(state, Failure::NoRuntime);
        };

        state.retry_count = state.retry_count.saturating_add(1);
        let delay = delay_for(
            state.retry_count,
            self.config.base_delay,
            self.config.max_delay,
        );

        warn!(
            attempt = state.retry_count,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting"
        );

        let token = state.next_timer_token();
        let weak = Arc::downgrade(self);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.on_retry_timer(token);
            }
        });

        state.pending_retry = Some(RetryTimer {
            token,
            task: task.abort_handle(),
        });

        countdown_message(delay)
    }

    /// Enters the terminal phase. Caller holds the lock.
    fn fail(state: &mut ConnectionState, failure: Failure) -> String {
        error!(error = %failure.into_error(), "Event stream supervision failed");
        state.phase = Phase::Failed;
        state.failure = Some(failure);
        FAILED_MESSAGE.to_owned()
    }

    fn on_retry_timer(self: &Arc<Self>, token: u64) {
        let (generation, previous) = {
            let mut state = self.state.lock();
            let armed = state.phase == Phase::Reconnecting
                && state
                    .pending_retry
                    .as_ref()
                    .is_some_and(|timer| timer.token == token);
            if !armed {
                debug!(token, "Ignoring stale retry timer");
                return;
            }

            state.pending_retry = None;
            debug!(attempt = state.retry_count, "Retry timer fired");
            state.begin_attempt()
        };

        self.open_attempt(generation, previous);
    }
}

// ============================================================================
// Failure
// ============================================================================

impl Failure {
    /// Converts to the public error type.
    fn into_error(self) -> Error {
        match self {
            Self::RetriesExhausted(attempts) => Error::retries_exhausted(attempts),
            Self::NoRuntime => Error::config("no Tokio runtime available for reconnect timers"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::time::sleep;

    use crate::presenter::ErrorDetail;

    // ------------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------------

    struct Opened {
        sink: EventSink,
        closed: Arc<AtomicBool>,
    }

    /// Transport whose connections are driven by the test.
    #[derive(Default)]
    struct ScriptedTransport {
        opens: Mutex<Vec<Opened>>,
        /// Fail synchronously inside `open`.
        fail_inline: bool,
    }

    struct ScriptedHandle(Arc<AtomicBool>);

    impl TransportHandle for ScriptedHandle {
        fn close(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl Transport for ScriptedTransport {
        fn open(&self, _endpoint: &Url, sink: EventSink) -> Box<dyn TransportHandle> {
            let closed = Arc::new(AtomicBool::new(false));
            self.opens.lock().push(Opened {
                sink: Arc::clone(&sink),
                closed: Arc::clone(&closed),
            });
            if self.fail_inline {
                sink(TransportEvent::Error("refused".into()));
            }
            Box::new(ScriptedHandle(closed))
        }
    }

    impl ScriptedTransport {
        fn emit(&self, index: usize, event: TransportEvent) {
            let sink = Arc::clone(&self.opens.lock()[index].sink);
            sink(event);
        }

        fn fail(&self, index: usize) {
            self.emit(index, TransportEvent::Error("connection refused".into()));
        }

        fn open_count(&self) -> usize {
            self.opens.lock().len()
        }

        fn is_closed(&self, index: usize) -> bool {
            self.opens.lock()[index].closed.load(Ordering::SeqCst)
        }
    }

    /// Presenter recording every call.
    #[derive(Default)]
    struct RecordingPresenter {
        calls: Mutex<Vec<String>>,
    }

    impl Presenter for RecordingPresenter {
        fn show_building(&self, message: Option<&str>) {
            self.calls
                .lock()
                .push(format!("building:{}", message.unwrap_or_default()));
        }

        fn show_error(&self, message: Option<&str>, _error: Option<&ErrorDetail>) {
            self.calls
                .lock()
                .push(format!("error:{}", message.unwrap_or_default()));
        }

        fn hide(&self) {
            self.calls.lock().push("hide".into());
        }
    }

    impl RecordingPresenter {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn countdowns(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| {
                    call.strip_prefix("building:")
                        .filter(|message| message.starts_with("Reconnecting"))
                        .map(str::to_owned)
                })
                .collect()
        }

        fn last(&self) -> String {
            self.calls.lock().last().cloned().unwrap_or_default()
        }
    }

    struct Harness {
        supervisor: StreamSupervisor,
        transport: Arc<ScriptedTransport>,
        presenter: Arc<RecordingPresenter>,
    }

    fn harness_with(config: SupervisorConfig, transport: ScriptedTransport) -> Harness {
        let transport = Arc::new(transport);
        let presenter = Arc::new(RecordingPresenter::default());
        let supervisor = StreamSupervisor::new(
            config,
            Arc::clone(&presenter) as Arc<dyn Presenter>,
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .unwrap();
        Harness {
            supervisor,
            transport,
            presenter,
        }
    }

    fn harness() -> Harness {
        harness_with(SupervisorConfig::default(), ScriptedTransport::default())
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn assert_invariants(supervisor: &StreamSupervisor) {
        let snap = supervisor.snapshot();
        assert_eq!(snap.retry_pending, snap.phase == Phase::Reconnecting);
    }

    // ------------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_start_opens_once_and_shows_compiling() {
        let h = harness();
        h.supervisor.start();
        h.supervisor.start();

        assert_eq!(h.transport.open_count(), 1);
        assert_eq!(h.supervisor.phase(), Phase::Connecting);
        assert_eq!(h.presenter.calls(), vec!["building:Compiling..."]);
        assert_invariants(&h.supervisor);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_transitions_to_open() {
        let h = harness();
        h.supervisor.start();
        h.transport.emit(0, TransportEvent::Open);

        assert_eq!(h.supervisor.phase(), Phase::Open);
        assert_eq!(h.supervisor.retry_count(), 0);

        h.supervisor.start();
        assert_eq!(h.transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_immediate_failures_count_down() {
        let h = harness();
        h.supervisor.start();

        h.transport.fail(0);
        assert_eq!(h.supervisor.phase(), Phase::Reconnecting);
        assert_eq!(h.supervisor.retry_count(), 1);
        assert_invariants(&h.supervisor);

        sleep(ms(1001)).await;
        assert_eq!(h.transport.open_count(), 2);
        assert_eq!(h.supervisor.phase(), Phase::Connecting);
        h.transport.fail(1);

        sleep(ms(2001)).await;
        assert_eq!(h.transport.open_count(), 3);
        h.transport.fail(2);

        assert_eq!(
            h.presenter.countdowns(),
            vec![
                "Reconnecting in 1s...",
                "Reconnecting in 2s...",
                "Reconnecting in 4s..."
            ]
        );
        assert_eq!(h.presenter.last(), "building:Reconnecting in 4s...");
        assert!((0..3).all(|i| h.transport.is_closed(i)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_for_full_delay() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);

        sleep(ms(999)).await;
        assert_eq!(h.transport.open_count(), 1);

        sleep(ms(2)).await;
        assert_eq!(h.transport.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_restarts_after_successful_open() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);
        sleep(ms(1001)).await;
        h.transport.fail(1);
        sleep(ms(2001)).await;

        h.transport.emit(2, TransportEvent::Open);
        assert_eq!(h.supervisor.retry_count(), 0);

        h.transport.fail(2);
        assert_eq!(h.presenter.last(), "building:Reconnecting in 1s...");
        assert_eq!(h.supervisor.retry_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_capped() {
        let h = harness();
        h.supervisor.start();

        for attempt in 0..7 {
            h.transport.fail(attempt);
            sleep(ms(30_001)).await;
        }

        let countdowns = h.presenter.countdowns();
        assert_eq!(countdowns[4], "Reconnecting in 16s...");
        assert_eq!(countdowns[5], "Reconnecting in 30s...");
        assert_eq!(countdowns[6], "Reconnecting in 30s...");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_error_arms_single_timer() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);
        h.transport.fail(0);

        assert_eq!(h.supervisor.retry_count(), 1);
        sleep(ms(10_000)).await;
        assert_eq!(h.transport.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_retry() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);

        h.supervisor.stop();
        assert_eq!(h.supervisor.phase(), Phase::Idle);
        assert!(!h.supervisor.snapshot().retry_pending);

        sleep(ms(60_000)).await;
        assert_eq!(h.transport.open_count(), 1);
        assert_invariants(&h.supervisor);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_error_after_stop_is_ignored() {
        let h = harness();
        h.supervisor.start();
        h.supervisor.stop();
        assert!(h.transport.is_closed(0));

        let before = h.presenter.calls();
        h.transport.fail(0);

        assert_eq!(h.supervisor.phase(), Phase::Idle);
        assert_eq!(h.supervisor.retry_count(), 0);
        assert_eq!(h.presenter.calls(), before);

        sleep(ms(60_000)).await;
        assert_eq!(h.transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_events_from_superseded_connection_are_ignored() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);
        sleep(ms(1001)).await;

        h.transport.emit(0, TransportEvent::Open);
        h.transport.fail(0);

        assert_eq!(h.supervisor.phase(), Phase::Connecting);
        assert_eq!(h.supervisor.retry_count(), 1);
        assert!(!h.supervisor.snapshot().retry_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let h = harness();
        h.supervisor.stop();
        h.supervisor.start();
        h.supervisor.stop();
        h.supervisor.stop();

        assert_eq!(h.supervisor.phase(), Phase::Idle);
        assert!(!h.supervisor.snapshot().connection_live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_reconnecting_is_noop() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);
        h.supervisor.start();

        assert_eq!(h.transport.open_count(), 1);
        assert_eq!(h.supervisor.phase(), Phase::Reconnecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop_resets_retry_count() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);
        h.supervisor.stop();

        h.supervisor.start();
        assert_eq!(h.supervisor.retry_count(), 0);
        assert_eq!(h.transport.open_count(), 2);

        h.transport.fail(1);
        assert_eq!(h.presenter.last(), "building:Reconnecting in 1s...");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling_is_terminal() {
        let h = harness_with(
            SupervisorConfig::default().with_max_retries(2),
            ScriptedTransport::default(),
        );
        h.supervisor.start();
        h.transport.fail(0);
        sleep(ms(1001)).await;
        h.transport.fail(1);
        sleep(ms(2001)).await;
        h.transport.fail(2);

        assert_eq!(h.supervisor.phase(), Phase::Failed);
        assert_eq!(h.presenter.last(), "building:Connection failed");
        assert_invariants(&h.supervisor);

        sleep(ms(120_000)).await;
        assert_eq!(h.transport.open_count(), 3);

        h.supervisor.start();
        assert_eq!(h.transport.open_count(), 4);
        assert_eq!(h.supervisor.retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ceiling_fails_on_first_error() {
        let h = harness_with(
            SupervisorConfig::default().with_max_retries(0),
            ScriptedTransport::default(),
        );
        h.supervisor.start();
        h.transport.fail(0);

        assert_eq!(h.supervisor.phase(), Phase::Failed);
        assert!(h.presenter.countdowns().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_during_open_is_handled() {
        let transport = ScriptedTransport {
            fail_inline: true,
            ..Default::default()
        };
        let h = harness_with(SupervisorConfig::default(), transport);
        h.supervisor.start();

        assert_eq!(h.supervisor.phase(), Phase::Reconnecting);
        assert_eq!(h.supervisor.retry_count(), 1);
        assert!(h.transport.is_closed(0));
        assert!(!h.supervisor.snapshot().connection_live);

        sleep(ms(1001)).await;
        assert_eq!(h.transport.open_count(), 2);
        assert_eq!(h.supervisor.retry_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_reach_handler_only_while_current() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let h = harness();
        let supervisor = h.supervisor.with_message_handler(move |message, presenter| {
            seen_clone.lock().push(message.data.clone());
            if message.data == "ready" {
                presenter.hide();
            }
        });

        supervisor.start();
        h.transport.emit(0, TransportEvent::Open);
        h.transport.emit(
            0,
            TransportEvent::Message(StreamMessage::named("connected", "{}")),
        );
        h.transport
            .emit(0, TransportEvent::Message(StreamMessage::new("ready")));

        assert_eq!(*seen.lock(), vec!["{}", "ready"]);
        assert_eq!(h.presenter.last(), "hide");
        assert_eq!(supervisor.phase(), Phase::Open);

        supervisor.stop();
        h.transport
            .emit(0, TransportEvent::Message(StreamMessage::new("late")));
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_connection_and_timer() {
        let h = harness();
        h.supervisor.start();
        h.transport.fail(0);
        sleep(ms(1001)).await;

        let transport = Arc::clone(&h.transport);
        drop(h);

        assert!(transport.is_closed(1));
        sleep(ms(60_000)).await;
        assert_eq!(transport.open_count(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = StreamSupervisor::new(
            SupervisorConfig::default().with_endpoint("not a url"),
            Arc::new(RecordingPresenter::default()),
            Arc::new(ScriptedTransport::default()),
        );
        assert!(result.unwrap_err().is_config_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_from_foreign_thread_arms_timer() {
        let h = harness();
        h.supervisor.start();

        let sink = Arc::clone(&h.transport.opens.lock()[0].sink);
        std::thread::spawn(move || sink(TransportEvent::Error("reset by peer".into())))
            .join()
            .unwrap();

        assert_eq!(h.supervisor.phase(), Phase::Reconnecting);
        assert!(h.supervisor.snapshot().retry_pending);
        assert_invariants(&h.supervisor);

        sleep(ms(1001)).await;
        assert_eq!(h.transport.open_count(), 2);
    }

    #[test]
    fn test_missing_runtime_fails_instead_of_panicking() {
        let transport = ScriptedTransport {
            fail_inline: true,
            ..Default::default()
        };
        let h = harness_with(SupervisorConfig::default(), transport);
        h.supervisor.start();

        assert_eq!(h.supervisor.phase(), Phase::Failed);
        assert!(h.supervisor.failure().unwrap().is_terminal());
        assert_eq!(h.presenter.last(), "building:Connection failed");
        assert_invariants(&h.supervisor);
    }

    #[test]
    fn test_explicit_runtime_drives_retries() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let h = harness();
        let supervisor = h.supervisor.with_runtime(runtime.handle().clone());

        supervisor.start();
        h.transport.fail(0);
        assert!(supervisor.snapshot().retry_pending);

        runtime.block_on(async { sleep(ms(1001)).await });
        assert_eq!(h.transport.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_reported_until_restart() {
        let h = harness_with(
            SupervisorConfig::default().with_max_retries(1),
            ScriptedTransport::default(),
        );
        h.supervisor.start();
        assert!(h.supervisor.failure().is_none());

        h.transport.fail(0);
        sleep(ms(1001)).await;
        h.transport.fail(1);

        let err = h.supervisor.failure().unwrap();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 1 }));
        assert!(err.is_terminal());

        h.supervisor.start();
        assert!(h.supervisor.failure().is_none());
    }

    /// Presenter that reads the supervisor's phase on every call.
    #[derive(Default)]
    struct PhaseReadingPresenter {
        supervisor: std::sync::OnceLock<Weak<StreamSupervisor>>,
        seen: Mutex<Vec<(String, Phase)>>,
    }

    impl PhaseReadingPresenter {
        fn record(&self, call: &str) {
            if let Some(supervisor) = self.supervisor.get().and_then(Weak::upgrade) {
                let phase = supervisor.phase();
                self.seen.lock().push((call.to_owned(), phase));
            }
        }
    }

    impl Presenter for PhaseReadingPresenter {
        fn show_building(&self, message: Option<&str>) {
            self.record(message.unwrap_or_default());
        }

        fn show_error(&self, message: Option<&str>, _error: Option<&ErrorDetail>) {
            self.record(message.unwrap_or_default());
        }

        fn hide(&self) {
            self.record("hide");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_presenter_may_query_supervisor() {
        let transport = Arc::new(ScriptedTransport::default());
        let presenter = Arc::new(PhaseReadingPresenter::default());
        let supervisor = Arc::new(
            StreamSupervisor::new(
                SupervisorConfig::default(),
                Arc::clone(&presenter) as Arc<dyn Presenter>,
                Arc::clone(&transport) as Arc<dyn Transport>,
            )
            .unwrap(),
        );
        let _ = presenter.supervisor.set(Arc::downgrade(&supervisor));

        supervisor.start();
        transport.fail(0);

        assert_eq!(
            *presenter.seen.lock(),
            vec![
                ("Compiling...".to_owned(), Phase::Connecting),
                ("Reconnecting in 1s...".to_owned(), Phase::Reconnecting),
            ]
        );
    }
}

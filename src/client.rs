//! Composition root.
//!
//! [`LiveStatus`] wires one [`StatusDisplay`] to one [`StreamSupervisor`]
//! and exposes the two lifecycle hooks a host calls: [`LiveStatus::ready`]
//! once the surface exists and [`LiveStatus::teardown`] on exit.
//!
//! # Example
//!
//! ```no_run
//! use flogo_live::{LiveStatus, SupervisorConfig};
//!
//! # async fn example() -> flogo_live::Result<()> {
//! let live = LiveStatus::terminal(SupervisorConfig::from_env())?;
//! live.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::io::Stderr;
use std::sync::Arc;

use tracing::debug;

use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::presenter::{Presenter, StatusDisplay, Surface, TerminalSurface};
use crate::protocol::StreamMessage;
use crate::supervisor::StreamSupervisor;
use crate::transport::{SseTransport, Transport};

// ============================================================================
// LiveStatus
// ============================================================================

/// One status display fed by one supervised event stream.
pub struct LiveStatus<S: Surface + 'static> {
    display: Arc<StatusDisplay<S>>,
    supervisor: StreamSupervisor,
}

impl<S: Surface + 'static> fmt::Debug for LiveStatus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStatus")
            .field("display", &self.display)
            .field("supervisor", &self.supervisor)
            .finish()
    }
}

// ============================================================================
// LiveStatus - Constructors
// ============================================================================

impl LiveStatus<TerminalSurface<Stderr>> {
    /// Builds a client drawing on stderr and reading over HTTP.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if `config` is invalid
    /// - [`Error::Http`](crate::Error::Http) if the HTTP client cannot be built
    pub fn terminal(config: SupervisorConfig) -> Result<Self> {
        let transport = Arc::new(SseTransport::new()?);
        Self::new(config, Some(TerminalSurface::stderr()), transport)
    }
}

impl<S: Surface + 'static> LiveStatus<S> {
    /// Builds a client on `mount` using `transport`.
    ///
    /// Nothing is drawn and nothing is opened until [`LiveStatus::ready`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if `config` is invalid
    /// - [`Error::Config`](crate::Error::Config) if `mount` is `None`
    pub fn new(
        config: SupervisorConfig,
        mount: Option<S>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;

        let display = Arc::new(StatusDisplay::new(mount)?);
        let presenter: Arc<dyn Presenter> = Arc::clone(&display) as Arc<dyn Presenter>;
        let supervisor = StreamSupervisor::new(config, presenter, transport)?;

        Ok(Self {
            display,
            supervisor,
        })
    }

    /// Installs an application hook for received messages.
    #[must_use]
    pub fn with_message_handler(
        self,
        handler: impl Fn(&StreamMessage, &dyn Presenter) + Send + Sync + 'static,
    ) -> Self {
        Self {
            display: self.display,
            supervisor: self.supervisor.with_message_handler(handler),
        }
    }
}

// ============================================================================
// LiveStatus - Lifecycle
// ============================================================================

impl<S: Surface + 'static> LiveStatus<S> {
    /// Host is ready: starts supervision.
    pub fn ready(&self) {
        debug!("Host ready");
        self.supervisor.start();
    }

    /// Host is going away: stops supervision and clears the display.
    pub fn teardown(&self) {
        debug!("Host teardown");
        self.supervisor.stop();
        self.display.destroy();
    }

    /// Runs [`ready`](Self::ready), waits for `shutdown`, then tears down.
    pub async fn run_until<F: Future>(&self, shutdown: F) -> F::Output {
        self.ready();
        let output = shutdown.await;
        self.teardown();
        output
    }

    /// Close control on the status bar.
    #[inline]
    pub fn dismiss(&self) {
        self.display.dismiss();
    }

    /// Returns the status display.
    #[inline]
    #[must_use]
    pub fn display(&self) -> &StatusDisplay<S> {
        &self.display
    }

    /// Returns the supervisor.
    #[inline]
    #[must_use]
    pub fn supervisor(&self) -> &StreamSupervisor {
        &self.supervisor
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use url::Url;

    use crate::presenter::{Status, View};
    use crate::supervisor::Phase;
    use crate::transport::{EventSink, TransportEvent, TransportHandle};

    #[derive(Default)]
    struct CountingTransport {
        opens: AtomicUsize,
        closed: Arc<AtomicBool>,
        sinks: Mutex<Vec<EventSink>>,
    }

    struct Handle(Arc<AtomicBool>);

    impl TransportHandle for Handle {
        fn close(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl Transport for CountingTransport {
        fn open(&self, _endpoint: &Url, sink: EventSink) -> Box<dyn TransportHandle> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.sinks.lock().push(sink);
            Box::new(Handle(Arc::clone(&self.closed)))
        }
    }

    #[derive(Clone, Default)]
    struct MemorySurface {
        frames: Arc<Mutex<Vec<View>>>,
        cleared: Arc<AtomicBool>,
    }

    impl Surface for MemorySurface {
        fn render(&mut self, view: &View) -> Result<()> {
            self.frames.lock().push(view.clone());
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.cleared.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_missing_mount_fails_before_any_work() {
        let transport = Arc::new(CountingTransport::default());
        let err = LiveStatus::<MemorySurface>::new(
            SupervisorConfig::default(),
            None,
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .unwrap_err();

        assert!(err.is_config_error());
        assert_eq!(transport.opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_config_fails_before_mounting() {
        let surface = MemorySurface::default();
        let err = LiveStatus::new(
            SupervisorConfig::default().with_endpoint(""),
            Some(surface.clone()),
            Arc::new(CountingTransport::default()),
        )
        .unwrap_err();

        assert!(err.is_config_error());
        assert!(surface.frames.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_and_teardown() {
        let transport = Arc::new(CountingTransport::default());
        let surface = MemorySurface::default();
        let live = LiveStatus::new(
            SupervisorConfig::default(),
            Some(surface.clone()),
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .unwrap();

        live.ready();
        assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
        assert_eq!(live.display().status(), Status::Building);
        assert_eq!(surface.frames.lock()[0].message, "Compiling...");

        live.teardown();
        assert_eq!(live.supervisor().phase(), Phase::Idle);
        assert!(transport.closed.load(Ordering::SeqCst));
        assert!(surface.cleared.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_can_hide_on_ready_signal() {
        let transport = Arc::new(CountingTransport::default());
        let live = LiveStatus::new(
            SupervisorConfig::default(),
            Some(MemorySurface::default()),
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .unwrap()
        .with_message_handler(|message, presenter| {
            if message.data == "ready" {
                presenter.hide();
            }
        });

        live.ready();
        let sink = Arc::clone(&transport.sinks.lock()[0]);
        sink(TransportEvent::Open);
        sink(TransportEvent::Message(StreamMessage::new("ready")));

        assert_eq!(live.display().status(), Status::Fine);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_tears_down() {
        let transport = Arc::new(CountingTransport::default());
        let live = LiveStatus::new(
            SupervisorConfig::default(),
            Some(MemorySurface::default()),
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .unwrap();

        let value = live.run_until(async { 7 }).await;

        assert_eq!(value, 7);
        assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
        assert!(transport.closed.load(Ordering::SeqCst));
        assert_eq!(live.supervisor().phase(), Phase::Idle);
    }

    #[test]
    fn test_dismiss_returns_to_fine() {
        let live = LiveStatus::new(
            SupervisorConfig::default(),
            Some(MemorySurface::default()),
            Arc::new(CountingTransport::default()),
        )
        .unwrap();

        live.display().show_error(Some("Build failed"), None);
        live.dismiss();
        assert_eq!(live.display().status(), Status::Fine);
    }
}

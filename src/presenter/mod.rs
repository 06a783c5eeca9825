//! Status presentation.
//!
//! The supervisor reports through the [`Presenter`] trait only; it has no
//! idea how or where status is drawn.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Presenter`] | Transition calls used by the supervisor |
//! | [`StatusDisplay`] | Presenter that renders onto a [`Surface`] |
//! | [`Surface`] | Mount point abstraction |
//! | [`TerminalSurface`] | ANSI terminal mount point |
//! | [`ErrorDetail`] | Error object passed to [`Presenter::show_error`] |

// ============================================================================
// Submodules
// ============================================================================

/// Status display implementation.
pub mod display;

/// Presentation state, palette, and view types.
pub mod status;

/// Surface trait.
pub mod surface;

/// Terminal surface.
pub mod terminal;

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::sync::Arc;

// ============================================================================
// Re-exports
// ============================================================================

pub use display::StatusDisplay;
pub use status::{Palette, PresentationState, Status, Style, View};
pub use surface::Surface;
pub use terminal::TerminalSurface;

// ============================================================================
// Presenter
// ============================================================================

/// Imperative status transitions.
///
/// Implementations own their state; callers never mutate it directly.
pub trait Presenter: Send + Sync {
    /// Shows the building state with `message` or a default.
    fn show_building(&self, message: Option<&str>);

    /// Shows the error state with `message` or a default.
    ///
    /// The detail panel is shown only when `error` is given.
    fn show_error(&self, message: Option<&str>, error: Option<&ErrorDetail>);

    /// Returns to fine, hiding everything.
    fn hide(&self);
}

impl<P: Presenter + ?Sized> Presenter for Arc<P> {
    fn show_building(&self, message: Option<&str>) {
        (**self).show_building(message);
    }

    fn show_error(&self, message: Option<&str>, error: Option<&ErrorDetail>) {
        (**self).show_error(message, error);
    }

    fn hide(&self) {
        (**self).hide();
    }
}

// ============================================================================
// ErrorDetail
// ============================================================================

/// Diagnostic payload for the error panel.
///
/// The panel shows the trace when one is present, else the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    message: String,
    trace: Option<String>,
}

impl ErrorDetail {
    /// Creates a detail with only a message.
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    /// Attaches a trace.
    #[inline]
    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Builds a detail from an error and its `source()` chain.
    ///
    /// Errors without a source get no trace.
    #[must_use]
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let message = error.to_string();
        let mut source = error.source();
        if source.is_none() {
            return Self::new(message);
        }

        let mut trace = message.clone();
        while let Some(cause) = source {
            let _ = write!(trace, "\n  caused by: {cause}");
            source = cause.source();
        }

        Self::new(message).with_trace(trace)
    }

    /// Returns the error message.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the trace, if any.
    #[inline]
    #[must_use]
    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    /// Returns the text shown in the detail panel.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        self.trace.as_deref().unwrap_or(&self.message)
    }
}

impl From<&str> for ErrorDetail {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ErrorDetail {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

// ============================================================================
// Tests
// ============================================================================

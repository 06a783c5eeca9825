//! Status display driving a [`Surface`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::status::{
    DEFAULT_BUILDING_MESSAGE, DEFAULT_ERROR_MESSAGE, Palette, PresentationState, Status, View,
};
use super::surface::Surface;
use super::{ErrorDetail, Presenter};

// ============================================================================
// Types
// ============================================================================

/// State guarded by the display's lock.
struct DisplayInner<S> {
    surface: S,
    state: PresentationState,
    /// Last view pushed to the surface.
    rendered: View,
    destroyed: bool,
}

// ============================================================================
// StatusDisplay
// ============================================================================

/// Shows exactly one of fine, building, or error on a mounted surface.
///
/// All transitions go through the display's own methods; repeated calls
/// with the same arguments do not touch the surface again.
///
/// # Example
///
/// ```
/// use flogo_live::{Presenter, Status, StatusDisplay, TerminalSurface};
///
/// let display = StatusDisplay::new(Some(TerminalSurface::new(Vec::new())))?;
/// display.show_building(Some("Compiling..."));
/// assert_eq!(display.status(), Status::Building);
/// display.hide();
/// assert_eq!(display.status(), Status::Fine);
/// # Ok::<(), flogo_live::Error>(())
/// ```
pub struct StatusDisplay<S: Surface> {
    inner: Mutex<DisplayInner<S>>,
    palette: Palette,
}

impl<S: Surface> fmt::Debug for StatusDisplay<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StatusDisplay")
            .field("state", &inner.state)
            .field("destroyed", &inner.destroyed)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StatusDisplay - Constructors
// ============================================================================

impl<S: Surface> StatusDisplay<S> {
    /// Mounts a display on `mount` with the default palette.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `mount` is `None`; nothing is drawn
    /// - Any error from [`Surface::attach`]
    pub fn new(mount: Option<S>) -> Result<Self> {
        Self::with_palette(mount, Palette::DEFAULT)
    }

    /// Mounts a display on `mount` with custom colors.
    ///
    /// # Errors
    ///
    /// Same as [`StatusDisplay::new`].
    pub fn with_palette(mount: Option<S>, palette: Palette) -> Result<Self> {
        let Some(mut surface) = mount else {
            return Err(Error::config("StatusDisplay requires a valid mount point"));
        };

        surface.attach()?;

        Ok(Self {
            inner: Mutex::new(DisplayInner {
                surface,
                state: PresentationState::default(),
                rendered: View::hidden(&palette),
                destroyed: false,
            }),
            palette,
        })
    }
}

// ============================================================================
// StatusDisplay - Public API
// ============================================================================

impl<S: Surface> StatusDisplay<S> {
    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.inner.lock().state.status
    }

    /// Returns a copy of the current presentation state.
    #[must_use]
    pub fn state(&self) -> PresentationState {
        self.inner.lock().state.clone()
    }

    /// Returns the colors in use.
    #[inline]
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Close control: returns the display to fine.
    pub fn dismiss(&self) {
        debug!("Status dismissed");
        self.hide();
    }

    /// Clears the surface. Later transitions are ignored.
    pub fn destroy(&self) {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return;
        }

        inner.destroyed = true;
        inner.state = PresentationState::default();
        if let Err(e) = inner.surface.clear() {
            warn!(error = %e, "Failed to clear status surface");
        }
        debug!("Status display destroyed");
    }

    /// Applies a new state and redraws if the view changed.
    fn set_state(&self, state: PresentationState) {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            debug!(status = %state.status, "Ignoring status change on destroyed display");
            return;
        }

        let view = View::resolve(&state, &self.palette);
        inner.state = state;

        if view == inner.rendered {
            return;
        }

        if let Err(e) = inner.surface.render(&view) {
            warn!(error = %e, status = %view.status, "Failed to render status");
            return;
        }
        inner.rendered = view;
    }
}

// ============================================================================
// StatusDisplay - Presenter
// ============================================================================

impl<S: Surface> Presenter for StatusDisplay<S> {
    fn show_building(&self, message: Option<&str>) {
        self.set_state(PresentationState {
            status: Status::Building,
            message: message.unwrap_or(DEFAULT_BUILDING_MESSAGE).to_owned(),
            detail: None,
        });
    }

    fn show_error(&self, message: Option<&str>, error: Option<&ErrorDetail>) {
        self.set_state(PresentationState {
            status: Status::Error,
            message: message.unwrap_or(DEFAULT_ERROR_MESSAGE).to_owned(),
            detail: error.map(ErrorDetail::text).map(str::to_owned),
        });
    }

    fn hide(&self) {
        self.set_state(PresentationState::default());
    }
}

// ============================================================================
// Tests
// ============================================================================

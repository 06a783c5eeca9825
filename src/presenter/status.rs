//! Presentation state, colors, and the rendered view.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Message shown when building without a caller-supplied message.
pub const DEFAULT_BUILDING_MESSAGE: &str = "⚙️ Building...";

/// Message shown on error without a caller-supplied message.
pub const DEFAULT_ERROR_MESSAGE: &str = "❌ Error occurred";

// ============================================================================
// Status
// ============================================================================

/// The three mutually exclusive presentation states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Everything healthy, surfaces hidden.
    #[default]
    Fine,
    /// Build or reconnect in progress.
    Building,
    /// Something failed.
    Error,
}

impl Status {
    /// Returns the lowercase status name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fine => "fine",
            Self::Building => "building",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Style / Palette
// ============================================================================

/// Background and text color pair (`#rrggbb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    /// Background color.
    pub background: &'static str,
    /// Foreground text color.
    pub foreground: &'static str,
}

/// Color treatment for each status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Healthy state colors.
    pub fine: Style,
    /// Building state colors.
    pub building: Style,
    /// Error state colors.
    pub error: Style,
}

impl Palette {
    /// The stock light palette.
    pub const DEFAULT: Self = Self {
        fine: Style {
            background: "#e8f5e9",
            foreground: "#2e7d32",
        },
        building: Style {
            background: "#fff9c4",
            foreground: "#f57f17",
        },
        error: Style {
            background: "#ffebee",
            foreground: "#c62828",
        },
    };

    /// Returns the style for `status`.
    #[inline]
    #[must_use]
    pub const fn style(&self, status: Status) -> Style {
        match status {
            Status::Fine => self.fine,
            Status::Building => self.building,
            Status::Error => self.error,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// PresentationState
// ============================================================================

/// What the presenter currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationState {
    /// Current status.
    pub status: Status,
    /// Status line text.
    pub message: String,
    /// Diagnostic text, only meaningful when `status == Error`.
    pub detail: Option<String>,
}

// ============================================================================
// View
// ============================================================================

/// A fully resolved frame for a [`Surface`](super::Surface) to draw.
///
/// Two equal views render identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Status being drawn.
    pub status: Status,
    /// Colors for the status line.
    pub style: Style,
    /// Status line text, empty when hidden.
    pub message: String,
    /// Detail panel text, `None` hides the panel.
    pub detail: Option<String>,
}

impl View {
    /// Resolves `state` against `palette`.
    #[must_use]
    pub fn resolve(state: &PresentationState, palette: &Palette) -> Self {
        match state.status {
            Status::Fine => Self::hidden(palette),
            Status::Building => Self {
                status: Status::Building,
                style: palette.building,
                message: state.message.clone(),
                detail: None,
            },
            Status::Error => Self {
                status: Status::Error,
                style: palette.error,
                message: state.message.clone(),
                detail: state.detail.clone(),
            },
        }
    }

    /// The view with every surface hidden.
    #[must_use]
    pub fn hidden(palette: &Palette) -> Self {
        Self {
            status: Status::Fine,
            style: palette.fine,
            message: String::new(),
            detail: None,
        }
    }

    /// Returns `true` if the status line is shown.
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.status != Status::Fine
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Render target abstraction.
//!
//! A [`Surface`] is the mount point a [`StatusDisplay`](super::StatusDisplay)
//! draws into. It receives fully resolved [`View`]s and never sees
//! presentation state directly.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;

use super::status::View;

// ============================================================================
// Surface
// ============================================================================

/// A place status views are drawn.
pub trait Surface: Send {
    /// Prepares the surface. Called once, before the first render.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be initialized.
    fn attach(&mut self) -> Result<()> {
        Ok(())
    }

    /// Draws `view`, replacing whatever was drawn before.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing fails.
    fn render(&mut self, view: &View) -> Result<()>;

    /// Removes everything the surface drew.
    ///
    /// # Errors
    ///
    /// Returns an error if cleanup fails.
    fn clear(&mut self) -> Result<()>;
}

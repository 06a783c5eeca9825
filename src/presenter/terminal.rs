//! Terminal surface using 24-bit ANSI colors.
//!
//! Terminal output is append-only, so each visible view becomes one
//! status line (plus an indented detail panel for errors). Hiding after
//! something was shown prints a short line in the fine colors.
//!
//! ```text
//!  ⚙️ Building...
//!  ❌ Build failed
//!  ── Error Details ──
//!    main.go:12: undefined: foo
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, IsTerminal, Stderr, Write};

use crate::error::Result;

use super::status::{Style, View};
use super::surface::Surface;

// ============================================================================
// Constants
// ============================================================================

/// ANSI reset sequence.
const RESET: &str = "\x1b[0m";

/// Header of the detail panel.
const DETAIL_HEADER: &str = "── Error Details ──";

/// Line printed when the status returns to fine.
const FINE_MESSAGE: &str = "✓ Up to date";

// ============================================================================
// TerminalSurface
// ============================================================================

/// Writes status views to a terminal-like writer.
pub struct TerminalSurface<W: Write + Send> {
    writer: W,
    color: bool,
    /// Whether the last drawn view was visible.
    showing: bool,
}

impl TerminalSurface<Stderr> {
    /// Creates a surface on stderr, colored when stderr is a terminal.
    #[must_use]
    pub fn stderr() -> Self {
        let stderr = io::stderr();
        let color = stderr.is_terminal();
        Self::new(stderr).with_color(color)
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    /// Creates a colored surface on `writer`.
    #[inline]
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            color: true,
            showing: false,
        }
    }

    /// Enables or disables ANSI colors.
    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Consumes the surface, returning the writer.
    #[inline]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, style: Style, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.writer, "{}{text} {RESET}", ansi(style))
        } else {
            writeln!(self.writer, "{text}")
        }
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn attach(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn render(&mut self, view: &View) -> Result<()> {
        if !view.is_visible() {
            if self.showing {
                self.write_line(view.style, FINE_MESSAGE)?;
                self.showing = false;
            }
            self.writer.flush()?;
            return Ok(());
        }

        self.write_line(view.style, &format!(" {}", view.message))?;

        if let Some(detail) = &view.detail {
            let header = Style {
                background: "#ffffff",
                foreground: view.style.foreground,
            };
            self.write_line(header, DETAIL_HEADER)?;
            for line in detail.lines() {
                writeln!(self.writer, "  {line}")?;
            }
        }

        self.showing = true;
        self.writer.flush()?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.color {
            write!(self.writer, "{RESET}")?;
        }
        self.showing = false;
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds the escape sequence selecting `style`'s colors.
fn ansi(style: Style) -> String {
    let mut out = String::new();
    if let Some((r, g, b)) = parse_hex(style.background) {
        out.push_str(&format!("\x1b[48;2;{r};{g};{b}m"));
    }
    if let Some((r, g, b)) = parse_hex(style.foreground) {
        out.push_str(&format!("\x1b[38;2;{r};{g};{b}m"));
    }
    out
}

/// Parses `#rrggbb`.
fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

// ============================================================================
// Tests
// ============================================================================

//! Reconnect delay computation.
//!
//! Delays double with every consecutive failure and are capped:
//!
//! | Attempt | Delay (defaults) |
//! |---------|------------------|
//! | 1 | 1s |
//! | 2 | 2s |
//! | 3 | 4s |
//! | 5 | 16s |
//! | 6+ | 30s |

// ============================================================================
// Imports
// ============================================================================

use std::cmp;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on any single reconnect delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Exponents past this point always hit the cap for any sane base delay.
const MAX_EXPONENT: u32 = 32;

// ============================================================================
// Functions
// ============================================================================

/// Returns the delay before reconnect attempt number `attempt`.
///
/// `attempt` is 1-based; `0` is treated as the first attempt.
/// Computes `min(base * 2^(attempt-1), max)` without overflowing.
#[must_use]
pub fn delay_for(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    let base_ms = base.as_millis().min(u128::from(u64::MAX)) as u64;
    let delay_ms = base_ms.saturating_mul(1u64 << exponent);
    cmp::min(Duration::from_millis(delay_ms), max)
}

/// Formats the user-facing countdown for a scheduled reconnect.
///
/// ```
/// use std::time::Duration;
/// use flogo_live::backoff::countdown_message;
///
/// assert_eq!(countdown_message(Duration::from_millis(2000)), "Reconnecting in 2s...");
/// assert_eq!(countdown_message(Duration::from_millis(1500)), "Reconnecting in 1.5s...");
/// ```
#[must_use]
pub fn countdown_message(delay: Duration) -> String {
    format!("Reconnecting in {}s...", format_seconds(delay))
}

/// Renders a duration as seconds without trailing zeros.
fn format_seconds(delay: Duration) -> String {
    let millis = delay.as_millis();
    let whole = millis / 1000;
    let frac = millis % 1000;

    if frac == 0 {
        return whole.to_string();
    }

    let frac = format!("{frac:03}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

// ============================================================================
// Tests
// ============================================================================

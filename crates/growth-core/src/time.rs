// crates/growth-core/src/time.rs
// ============================================================================
// Module: Growth Core Time Model
// Description: Injectable clock and timestamp helpers shared by the IR
// evaluator, the journey executor, and the network queue's backoff math.
// Purpose: Keep wall-clock reads behind one seam so evaluation stays
// deterministic given fixed adapter/clock answers.
// Dependencies: time
// ============================================================================

//! ## Overview
//! The core never reads `SystemTime`/`OffsetDateTime::now_utc` directly
//! outside of [`SystemClock`]. Every other component takes a `&dyn Clock`
//! so tests can pin `now` and so the evaluator's determinism requirement
//! (spec §4.1) holds given fixed clock + adapter answers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use time::Duration as TimeDuration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of wall-clock time for the core.
///
/// # Invariants
/// - Implementations must be monotonic-enough for scheduling purposes; they
///   need not be monotonic in the `std::time::Instant` sense.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the OS wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that always returns a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

// ============================================================================
// SECTION: Duration helpers
// ============================================================================

/// Converts whole seconds (as used throughout the data model: delay
/// durations, wait-until `maxTime`, broker subscription windows) into a
/// [`TimeDuration`], clamping negative input to zero per spec §8 ("negative
/// delay is treated as 0").
#[must_use]
pub fn seconds_duration(seconds: i64) -> TimeDuration {
    TimeDuration::seconds(seconds.max(0))
}

/// Formats an [`OffsetDateTime`] as RFC 3339 for logs and wire payloads.
///
/// # Errors
///
/// Returns an error string when formatting fails (only possible for
/// out-of-range years, which the core never produces).
pub fn format_rfc3339(value: OffsetDateTime) -> Result<String, TimeFormatError> {
    value.format(&time::format_description::well_known::Rfc3339).map_err(|err| TimeFormatError {
        message: err.to_string(),
    })
}

/// Error returned when an [`OffsetDateTime`] cannot be formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormatError {
    /// Underlying formatting error message.
    pub message: String,
}

impl fmt::Display for TimeFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to format timestamp: {}", self.message)
    }
}

impl std::error::Error for TimeFormatError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn negative_delay_clamps_to_zero() {
        assert_eq!(seconds_duration(-5), TimeDuration::seconds(0));
        assert_eq!(seconds_duration(0), TimeDuration::seconds(0));
        assert_eq!(seconds_duration(60), TimeDuration::seconds(60));
    }

    #[test]
    fn fixed_clock_is_stable() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let clock = FixedClock(now);
        assert_eq!(clock.now(), now);
        assert_eq!(clock.now(), clock.now());
    }
}

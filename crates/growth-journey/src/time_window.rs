// crates/growth-journey/src/time_window.rs
// ============================================================================
// Module: Time Window Evaluation
// Description: `TimeWindow` node semantics (spec §4.5): day-of-week gating,
// overnight-window membership, and next-boundary computation.
// ============================================================================

use std::collections::BTreeSet;

use time::Duration;
use time::OffsetDateTime;
use time::UtcOffset;
use time::Weekday;

/// The outcome of evaluating a `TimeWindow` node at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// `now` falls inside the configured window.
    InWindow,
    /// Today is not an allowed day; resume at this day's midnight.
    NotAllowedDay(OffsetDateTime),
    /// `now` falls outside the window; resume at this boundary.
    OutsideWindow(OffsetDateTime),
}

/// Maps a [`Weekday`] to the spec's `1=Sun..7=Sat` convention.
#[must_use]
pub const fn weekday_number(day: Weekday) -> u8 {
    match day {
        Weekday::Sunday => 1,
        Weekday::Monday => 2,
        Weekday::Tuesday => 3,
        Weekday::Wednesday => 4,
        Weekday::Thursday => 5,
        Weekday::Friday => 6,
        Weekday::Saturday => 7,
    }
}

/// Evaluates a `TimeWindow` node (spec §4.5).
///
/// `now_utc` is the evaluation instant; `local_offset` is applied unless
/// `use_utc` is set, matching "device-local or UTC per `useUTC`".
#[must_use]
pub fn evaluate(
    now_utc: OffsetDateTime,
    use_utc: bool,
    local_offset: UtcOffset,
    start_minutes: u16,
    end_minutes: u16,
    days_of_week: Option<&BTreeSet<u8>>,
) -> WindowDecision {
    let local_now = if use_utc { now_utc.to_offset(UtcOffset::UTC) } else { now_utc.to_offset(local_offset) };
    let today_number = weekday_number(local_now.weekday());

    if let Some(days) = days_of_week {
        if !days.contains(&today_number) {
            let next_day = next_allowed_day(local_now, days);
            return WindowDecision::NotAllowedDay(midnight_of(next_day));
        }
    }

    let cur_seconds = seconds_since_midnight(local_now);
    let start_seconds = u32::from(start_minutes) * 60;
    let end_seconds = u32::from(end_minutes) * 60;

    let in_window = if start_seconds == end_seconds {
        true
    } else if start_seconds > end_seconds {
        cur_seconds >= start_seconds || cur_seconds < end_seconds
    } else {
        cur_seconds >= start_seconds && cur_seconds < end_seconds
    };

    if in_window {
        return WindowDecision::InWindow;
    }

    let next_start = if cur_seconds < start_seconds {
        at_seconds(local_now, start_seconds)
    } else {
        let next_day = days_of_week.map_or_else(
            || local_now.date().next_day().unwrap_or(local_now.date()),
            |days| next_allowed_day(local_now, days),
        );
        at_seconds(midnight_of(next_day), start_seconds)
    };
    WindowDecision::OutsideWindow(next_start)
}

fn seconds_since_midnight(at: OffsetDateTime) -> u32 {
    u32::from(at.hour()) * 3600 + u32::from(at.minute()) * 60 + u32::from(at.second())
}

fn midnight_of(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_time(time::Time::MIDNIGHT)
}

fn at_seconds(at: OffsetDateTime, seconds: u32) -> OffsetDateTime {
    midnight_of(at) + Duration::seconds(i64::from(seconds))
}

fn next_allowed_day(from: OffsetDateTime, days: &BTreeSet<u8>) -> OffsetDateTime {
    let mut candidate = from;
    for _ in 0..7 {
        candidate += Duration::days(1);
        if days.contains(&weekday_number(candidate.weekday())) {
            return candidate;
        }
    }
    from
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    fn at(hour: u8, minute: u8) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000)
            .unwrap()
            .replace_time(time::Time::from_hms(hour, minute, 0).unwrap())
    }

    #[test]
    fn always_open_when_start_equals_end() {
        let decision = evaluate(at(3, 0), true, UtcOffset::UTC, 100, 100, None);
        assert_eq!(decision, WindowDecision::InWindow);
    }

    #[test]
    fn overnight_window_spans_midnight() {
        let start = 22 * 60;
        let end = 6 * 60;
        assert_eq!(evaluate(at(23, 0), true, UtcOffset::UTC, start, end, None), WindowDecision::InWindow);
        assert_eq!(evaluate(at(2, 0), true, UtcOffset::UTC, start, end, None), WindowDecision::InWindow);
        assert!(matches!(
            evaluate(at(12, 0), true, UtcOffset::UTC, start, end, None),
            WindowDecision::OutsideWindow(_)
        ));
    }

    #[test]
    fn day_not_allowed_resumes_at_next_allowed_midnight() {
        let mut days = BTreeSet::new();
        days.insert(weekday_number(at(12, 0).weekday().next()));
        let decision = evaluate(at(12, 0), true, UtcOffset::UTC, 0, 60, Some(&days));
        assert!(matches!(decision, WindowDecision::NotAllowedDay(_)));
    }

    #[test]
    fn outside_window_before_start_resumes_same_day() {
        let decision = evaluate(at(8, 0), true, UtcOffset::UTC, 9 * 60, 17 * 60, None);
        match decision {
            WindowDecision::OutsideWindow(resume) => assert_eq!(resume.hour(), 9),
            other => panic!("expected OutsideWindow, got {other:?}"),
        }
    }
}

//! Fetch window calculation.
//!
//! Decides the `[since, until)` range for the next incremental pull from
//! the explicit run context. Pure; the caller supplies `now`.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::models::RunContext;

/// Half-open time range to request from the tracking API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl FetchWindow {
    /// Whether the window covers no time; the fetch may be skipped.
    pub fn is_empty(&self) -> bool {
        self.since >= self.until
    }
}

/// Compute the fetch window for the next run.
///
/// - Marker present: resume one second past it, up to `now`.
/// - Base without marker (cache restored without its marker): re-cover
///   yesterday and today.
/// - Cold start: look back `lookback_days` from `now`.
pub fn compute_window(context: &RunContext, lookback_days: i64, now: DateTime<Utc>) -> FetchWindow {
    if let Some(marker) = context.marker {
        return FetchWindow {
            since: marker + Duration::seconds(1),
            until: now,
        };
    }

    if context.base_exists {
        let yesterday = now.date_naive() - Duration::days(1);
        let since = yesterday.and_time(NaiveTime::MIN).and_utc();
        let until = now
            .date_naive()
            .and_time(NaiveTime::from_hms_opt(23, 59, 59).expect("valid wall-clock time"))
            .and_utc();
        return FetchWindow { since, until };
    }

    FetchWindow {
        since: now - Duration::days(lookback_days),
        until: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap()
    }

    #[test]
    fn cold_start_uses_lookback() {
        let window = compute_window(&RunContext::default(), 15, now());
        assert_eq!(window.since, Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        assert_eq!(window.until, now());
        assert!(!window.is_empty());
    }

    #[test]
    fn marker_resumes_one_second_past() {
        let marker = Utc.with_ymd_and_hms(2024, 3, 19, 18, 30, 0).unwrap();
        let context = RunContext::new(Some(marker), true);
        let window = compute_window(&context, 15, now());
        assert_eq!(window.since, Utc.with_ymd_and_hms(2024, 3, 19, 18, 30, 1).unwrap());
        assert_eq!(window.until, now());
    }

    #[test]
    fn marker_wins_over_base_presence() {
        let marker = Utc.with_ymd_and_hms(2024, 3, 19, 0, 0, 0).unwrap();
        let with_base = compute_window(&RunContext::new(Some(marker), true), 15, now());
        let without_base = compute_window(&RunContext::new(Some(marker), false), 15, now());
        assert_eq!(with_base, without_base);
    }

    #[test]
    fn base_without_marker_covers_yesterday_and_today() {
        let context = RunContext::new(None, true);
        let window = compute_window(&context, 15, now());
        assert_eq!(window.since, Utc.with_ymd_and_hms(2024, 3, 19, 0, 0, 0).unwrap());
        assert_eq!(window.until, Utc.with_ymd_and_hms(2024, 3, 20, 23, 59, 59).unwrap());
    }

    #[test]
    fn future_marker_yields_empty_window() {
        let marker = Utc.with_ymd_and_hms(2024, 3, 21, 0, 0, 0).unwrap();
        let context = RunContext::new(Some(marker), true);
        let window = compute_window(&context, 15, now());
        assert!(window.is_empty());
    }
}

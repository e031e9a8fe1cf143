//! Reporting window for autoscale statistics

use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};

/// Start and end of a reporting window, RFC 3339 in UTC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// A window reaching `lookback` into the past, in whole days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    lookback: Duration,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::new(std::time::Duration::ZERO)
    }
}

impl DateWindow {
    pub fn new(lookback: std::time::Duration) -> Self {
        Self {
            lookback: Duration::from_std(lookback).unwrap_or(Duration::MAX),
        }
    }

    /// From midnight of the day `lookback` before `now` to the last second
    /// of `now`'s day
    pub fn range(&self, now: DateTime<Utc>) -> DateRange {
        let from = now.checked_sub_signed(self.lookback).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let start = from.date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = now
            .date_naive()
            .and_hms_opt(23, 59, 59)
            .map(|t| t.and_utc())
            .unwrap_or(now);

        DateRange {
            start: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end: end.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn current(&self) -> DateRange {
        self.range(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_zero_lookback_covers_today() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 14, 30, 12).unwrap();
        let range = DateWindow::default().range(now);

        assert_eq!(range.start, "2025-03-02T00:00:00Z");
        assert_eq!(range.end, "2025-03-02T23:59:59Z");
    }

    #[test]
    fn test_lookback_truncates_to_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 1, 0, 0).unwrap();
        let range = DateWindow::new(std::time::Duration::from_secs(2 * 3600)).range(now);

        assert_eq!(range.start, "2025-03-01T00:00:00Z");
        assert_eq!(range.end, "2025-03-02T23:59:59Z");
    }

    #[test]
    fn test_multi_day_lookback() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let range = DateWindow::new(std::time::Duration::from_secs(7 * 24 * 3600)).range(now);

        assert_eq!(range.start, "2025-03-03T00:00:00Z");
    }
}

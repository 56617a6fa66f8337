use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

/// Format of the run timestamp embedded in coverage ids, e.g.
/// `2024-11-17T15.00.00Z`. The dots keep the id free of colons.
pub const RUN_TIME_FORMAT: &str = "%Y-%m-%dT%H.%M.%SZ";

/// Format of subset timestamps and time-period boundaries, e.g.
/// `2024-11-17T15:00:00Z`.
pub const SUBSET_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn parse_run_time(s: &str) -> Result<DateTime<Utc>> {
    parse_utc(s, RUN_TIME_FORMAT)
}

pub fn format_run_time(t: DateTime<Utc>) -> String {
    t.format(RUN_TIME_FORMAT).to_string()
}

pub fn parse_subset_time(s: &str) -> Result<DateTime<Utc>> {
    parse_utc(s, SUBSET_TIME_FORMAT)
}

pub fn format_subset_time(t: DateTime<Utc>) -> String {
    t.format(SUBSET_TIME_FORMAT).to_string()
}

fn parse_utc(s: &str, format: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), format)
        .map(|n| n.and_utc())
        .map_err(|_| Error::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn run_time_round_trips() {
        let t = parse_run_time("2024-11-17T15.00.00Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 11, 17, 15, 0, 0).unwrap());
        assert_eq!(format_run_time(t), "2024-11-17T15.00.00Z");
    }

    #[test]
    fn subset_time_round_trips() {
        let t = parse_subset_time("2024-11-17T18:00:00Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 11, 17, 18, 0, 0).unwrap());
        assert_eq!(format_subset_time(t), "2024-11-17T18:00:00Z");
    }

    #[test]
    fn formats_are_not_interchangeable() {
        assert!(parse_run_time("2024-11-17T15:00:00Z").is_err());
        assert!(parse_subset_time("2024-11-17T15.00.00Z").is_err());
        assert!(parse_run_time("not a timestamp").is_err());
    }
}

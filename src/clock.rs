//! UTC timestamps as stored and emitted by the API.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};

/// Current UTC time truncated to microseconds (the store's resolution).
pub fn utc_now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000).unwrap_or(now)
}

/// RFC 3339 with microseconds and a `Z` suffix, e.g. `2024-05-01T09:30:00.123456Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339, a zone-less date-time (taken as UTC) or a bare `YYYY-MM-DD` date.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_has_microsecond_resolution() {
        assert_eq!(utc_now().nanosecond() % 1_000, 0);
    }

    #[test]
    fn formats_with_micros_and_z() {
        let ts = parse_timestamp("2024-05-01T11:30:00+02:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-01T09:30:00.000000Z");
    }

    #[test]
    fn parses_dates_and_naive_times() {
        let day = parse_timestamp("2024-02-29").unwrap();
        assert_eq!(format_timestamp(&day), "2024-02-29T00:00:00.000000Z");
        let naive = parse_timestamp("2024-02-29T08:15:00.5").unwrap();
        assert_eq!(format_timestamp(&naive), "2024-02-29T08:15:00.500000Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-02-30").is_none());
        assert!(parse_timestamp("").is_none());
    }
}

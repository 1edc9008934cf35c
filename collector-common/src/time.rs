//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for optional timestamps written either as RFC 3339 or as
/// naive ISO 8601 (no offset). Always writes RFC 3339.
pub mod lenient_timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw))),
        }
    }
}

/// Random duration in the inclusive window `[min_ms, max_ms]`
///
/// An inverted window collapses to `min_ms`.
pub fn jittered(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return millis_to_duration(min_ms);
    }
    millis_to_duration(rand::thread_rng().gen_range(min_ms..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_millis_to_duration_one_second() {
        assert_eq!(millis_to_duration(1000), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_timestamp_accepts_both_forms() {
        let rfc = parse_timestamp("2024-03-01T12:30:00+01:00").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-03-01T11:30:00+00:00");

        let naive = parse_timestamp("2024-03-01T12:30:00.123456").unwrap();
        assert_eq!(naive.timestamp(), 1_709_296_200);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_jittered_stays_in_window() {
        for _ in 0..100 {
            let d = jittered(500, 2000);
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(2000));
        }
    }

    #[test]
    fn test_jittered_degenerate_window() {
        assert_eq!(jittered(700, 700), Duration::from_millis(700));
        assert_eq!(jittered(900, 100), Duration::from_millis(900));
    }
}

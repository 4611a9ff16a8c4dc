//! Datetime literals for ClickHouse statements

use chrono::{DateTime, TimeZone, Utc};

/// `DateTime64(6)` expression for `t`, e.g.
/// `toDateTime64('2023-10-01 12:34:56.789012', 6, 'UTC')`
pub fn time_to_string<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    format!(
        "toDateTime64('{}', 6, 'UTC')",
        t.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S%.6f")
    )
}

/// `DateTime` literal for `t` in UTC, whole seconds: `2023-10-01 12:34:56`
pub fn time_to_string32<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    t.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn sample() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2023-10-01T12:34:56.789012345Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_datetime64_literal() {
        assert_eq!(
            time_to_string(&sample()),
            "toDateTime64('2023-10-01 12:34:56.789012', 6, 'UTC')"
        );
    }

    #[test]
    fn test_datetime64_whole_seconds_keep_fraction() {
        let t = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(
            time_to_string(&t),
            "toDateTime64('2024-02-29 00:00:00.000000', 6, 'UTC')"
        );
    }

    #[test]
    fn test_datetime32_literal() {
        assert_eq!(time_to_string32(&sample()), "2023-10-01 12:34:56");
    }

    #[test]
    fn test_offsets_are_converted_to_utc() {
        let t = FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 10, 1, 2, 0, 0)
            .unwrap();
        assert_eq!(time_to_string32(&t), "2023-09-30 23:00:00");
        assert!(time_to_string(&t).contains("'2023-09-30 23:00:00.000000'"));
    }
}

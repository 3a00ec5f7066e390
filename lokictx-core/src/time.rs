//! Wall-clock timestamp to epoch-nanosecond conversion.
//!
//! Inputs use the fixed `YYYY-MM-DD HH:MM:SS` layout and are interpreted in
//! the configured [`TimeZoneMode`]. Scaling is done with integer arithmetic.

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::config::TimeZoneMode;
use crate::errors::{LokiCtxError, Result};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Converts a `YYYY-MM-DD HH:MM:SS` string into nanoseconds since the epoch.
///
/// Ambiguous local times (clocks turned back) resolve to the earlier
/// instant. Local times skipped by a DST jump are rejected.
pub fn to_epoch_nanos(input: &str, zone: TimeZoneMode) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), TIMESTAMP_FORMAT).map_err(|err| {
        LokiCtxError::time_parse(input, format!("{err} (expected {TIMESTAMP_FORMAT})"))
    })?;

    let seconds = match zone {
        TimeZoneMode::Utc => Utc.from_utc_datetime(&naive).timestamp(),
        TimeZoneMode::Fixed(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| LokiCtxError::time_parse(input, "not representable at offset"))?
            .timestamp(),
        TimeZoneMode::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| {
                LokiCtxError::time_parse(input, "does not exist in the local time zone")
            })?
            .timestamp(),
    };

    seconds
        .checked_mul(NANOS_PER_SECOND)
        .ok_or_else(|| LokiCtxError::time_parse(input, "out of range for epoch nanoseconds"))
}

/// Inclusive query bounds in epoch nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: i64,
    pub end: i64,
}

impl QueryWindow {
    pub fn parse(start: &str, end: &str, zone: TimeZoneMode) -> Result<Self> {
        let window = Self {
            start: to_epoch_nanos(start, zone)?,
            end: to_epoch_nanos(end, zone)?,
        };
        if window.is_inverted() {
            warn!(
                start = window.start,
                end = window.end,
                "query window start is after its end; the backend will likely return nothing"
            );
        }
        Ok(window)
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use test_case::test_case;

    #[test_case("1970-01-01 00:00:00", 0 ; "epoch")]
    #[test_case("1999-12-31 23:59:59", 946_684_799_000_000_000 ; "before y2k")]
    #[test_case("2025-10-06 12:00:00", 1_759_752_000_000_000_000 ; "window start")]
    #[test_case("2025-10-06 14:00:00", 1_759_759_200_000_000_000 ; "window end")]
    #[test_case("2262-04-11 23:47:16", 9_223_372_036_000_000_000 ; "last representable second")]
    fn converts_utc_timestamps(input: &str, expected: i64) {
        assert_eq!(to_epoch_nanos(input, TimeZoneMode::Utc).unwrap(), expected);
    }

    #[test]
    fn applies_fixed_offset() {
        let zone = TimeZoneMode::Fixed(FixedOffset::east_opt(7 * 3600).unwrap());
        assert_eq!(
            to_epoch_nanos("2025-10-06 12:00:00", zone).unwrap(),
            1_759_726_800_000_000_000
        );
    }

    #[test_case("2025-10-06T12:00:00" ; "iso separator")]
    #[test_case("2025-13-01 00:00:00" ; "month out of range")]
    #[test_case("2025-10-06 12:00" ; "missing seconds")]
    #[test_case("" ; "empty")]
    fn rejects_malformed_input(input: &str) {
        let err = to_epoch_nanos(input, TimeZoneMode::Utc).unwrap_err();
        assert!(matches!(err, LokiCtxError::TimeParse { .. }));
    }

    #[test]
    fn rejects_overflow() {
        let err = to_epoch_nanos("2262-04-11 23:47:17", TimeZoneMode::Utc).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn conversion_is_monotonic_in_local_time() {
        let inputs = [
            "2024-01-01 00:00:00",
            "2024-01-01 00:00:01",
            "2024-06-15 08:30:00",
            "2024-12-31 23:59:59",
            "2025-10-06 12:00:00",
        ];
        let converted: Vec<i64> = inputs
            .iter()
            .map(|input| to_epoch_nanos(input, TimeZoneMode::Local).unwrap())
            .collect();
        assert!(converted.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn window_flags_inverted_bounds() {
        let window =
            QueryWindow::parse("2025-10-06 14:00:00", "2025-10-06 12:00:00", TimeZoneMode::Utc)
                .unwrap();
        assert!(window.is_inverted());
        assert_eq!(window.end - window.start, -7_200_000_000_000);
    }
}

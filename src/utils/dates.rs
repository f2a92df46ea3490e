//! Flexible parsing for legacy datetime strings
//!
//! The KeySoft export is inconsistent about date encoding: most values are
//! RFC3339, some are bare dates, some use the old `DD/MM/YYYY` entry
//! format. Everything is normalized to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DateParseError {
    #[error("Invalid datetime format: '{input}'")]
    InvalidFormat { input: String },
}

/// Parse a legacy datetime from the formats observed in real exports.
pub fn parse_flexible(input: &str) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for format in &datetime_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    let date_formats = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
    for format in &date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    Err(DateParseError::InvalidFormat {
        input: input.to_string(),
    })
}

/// Lenient variant used for optional legacy fields: unparsable input is
/// treated as absent, not as an error.
pub fn parse_optional(input: Option<&str>) -> Option<DateTime<Utc>> {
    input.and_then(|s| parse_flexible(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339() {
        let dt = parse_flexible("2003-05-12T14:30:00Z").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2003, 5, 12));
        assert_eq!(dt.hour(), 14);
    }

    #[test]
    fn parses_bare_date_as_midnight_utc() {
        let dt = parse_flexible("2003-05-12").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2003, 5, 12));
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn parses_legacy_slash_format() {
        let dt = parse_flexible("12/05/2003").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2003, 5, 12));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_flexible("not-a-date").is_err());
    }

    #[test]
    fn optional_parse_swallows_garbage() {
        assert!(parse_optional(Some("not-a-date")).is_none());
        assert!(parse_optional(None).is_none());
        assert!(parse_optional(Some("2003-05-12")).is_some());
    }
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Returned when a date string matches none of the accepted formats.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date '{0}'")]
pub struct InvalidDate(String);

/// The sentinel clients send when they leave the date blank: `0001-01-01T00:00:00`.
pub fn empty_date() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

/// Returns `true` if `value` is the blank-date sentinel.
pub fn is_empty_date(value: &NaiveDateTime) -> bool {
    *value == empty_date()
}

/// Parses a date or date-time.
///
/// Accepts RFC 3339 (the offset is dropped and the wall clock kept), naive
/// date-times with a `T` or a space separator, with or without seconds, and a
/// bare `YYYY-MM-DD`, which is read as midnight.
pub fn parse_date_time(input: &str) -> Result<NaiveDateTime, InvalidDate> {
    let trimmed = input.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.naive_local());
    }

    for format in NAIVE_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(value);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| InvalidDate(input.to_string()))
}

/// Serde helper for optional date fields. `null`, a missing value and a blank
/// string all become `None`.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date_time(&value).map_err(serde::de::Error::custom))
        .transpose()
}

//! Duration-string parsing
//!
//! Durations are written as a positive integer followed by a single unit
//! character: `30s`, `10m`, `2h`, `1d`. All results are milliseconds.

use crate::error::{CoreError, Result};

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

fn unit_millis(unit: char) -> Option<i64> {
    match unit {
        's' => Some(MILLIS_PER_SECOND),
        'm' => Some(MILLIS_PER_MINUTE),
        'h' => Some(MILLIS_PER_HOUR),
        'd' => Some(MILLIS_PER_DAY),
        _ => None,
    }
}

/// Parse a duration string like `"1h"` into milliseconds.
///
/// Parsing is pure and deterministic; the same input always yields the
/// same millisecond value.
pub fn parse_duration(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    let unit = trimmed
        .chars()
        .last()
        .ok_or_else(|| CoreError::invalid_duration(input, "empty duration"))?;
    let unit_ms = unit_millis(unit).ok_or_else(|| {
        CoreError::invalid_duration(input, format!("unknown unit '{unit}', expected one of s/m/h/d"))
    })?;

    let digits = &trimmed[..trimmed.len() - unit.len_utf8()];
    if digits.is_empty() {
        return Err(CoreError::invalid_duration(input, "missing numeric value"));
    }
    // u64 parse rejects signs, so negative durations fail here.
    let value: u64 = digits
        .parse()
        .map_err(|_| CoreError::invalid_duration(input, format!("'{digits}' is not an integer")))?;
    if value == 0 {
        return Err(CoreError::invalid_duration(input, "duration must be positive"));
    }
    let value = i64::try_from(value)
        .map_err(|_| CoreError::invalid_duration(input, "value out of range"))?;

    value
        .checked_mul(unit_ms)
        .ok_or_else(|| CoreError::invalid_duration(input, "value out of range"))
}

/// Millisecond length of one calendar unit of a duration string.
///
/// `"2h"` has a granularity of one hour; `"7d"` of one day. Used to align
/// derived periods to the calendar unit of the smallest window.
pub fn one_unit_of_duration(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    let unit = trimmed
        .chars()
        .last()
        .ok_or_else(|| CoreError::invalid_duration(input, "empty duration"))?;
    unit_millis(unit).ok_or_else(|| {
        CoreError::invalid_duration(input, format!("unknown unit '{unit}', expected one of s/m/h/d"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s").unwrap(), 30_000);
        assert_eq!(parse_duration("10m").unwrap(), 600_000);
        assert_eq!(parse_duration("2h").unwrap(), 7_200_000);
        assert_eq!(parse_duration("1d").unwrap(), 86_400_000);
    }

    #[test]
    fn test_parse_duration_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(parse_duration("6h").unwrap(), 21_600_000);
        }
    }

    #[test]
    fn test_parse_duration_rejects_bad_input() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10w").is_err());
        assert!(parse_duration("-5h").is_err());
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("1.5h").is_err());
    }

    #[test]
    fn test_one_unit_of_duration() {
        assert_eq!(one_unit_of_duration("2h").unwrap(), 3_600_000);
        assert_eq!(one_unit_of_duration("90m").unwrap(), 60_000);
        assert_eq!(one_unit_of_duration("1d").unwrap(), 86_400_000);
        assert!(one_unit_of_duration("10w").is_err());
    }
}

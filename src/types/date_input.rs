//! Flexible date inputs for the public request surface.

use chrono::{NaiveDate, NaiveDateTime};

/// A caller-supplied point in time.
///
/// Accepts a `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` string, a [`NaiveDate`],
/// or a [`NaiveDateTime`]. Date-only inputs resolve to midnight, so a request
/// from `"2024-09-01"` to `"2024-09-02"` covers exactly September 1st (range
/// ends are exclusive).
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DateInput {
    /// Resolves the input to a concrete timestamp.
    pub fn resolve(&self) -> Result<NaiveDateTime, InvalidDate> {
        match self {
            DateInput::DateTime(dt) => Ok(*dt),
            DateInput::Date(date) => Ok(date.and_hms_opt(0, 0, 0).expect("midnight exists")),
            DateInput::Text(raw) => {
                let trimmed = raw.trim();
                if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
                    return Ok(dt);
                }
                if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
                    return Ok(dt);
                }
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight exists"))
                    .map_err(|_| InvalidDate(raw.clone()))
            }
        }
    }
}

/// Parse failure for a date input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}' (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)")]
pub struct InvalidDate(pub String);

impl From<&str> for DateInput {
    fn from(raw: &str) -> Self {
        DateInput::Text(raw.to_string())
    }
}

impl From<String> for DateInput {
    fn from(raw: String) -> Self {
        DateInput::Text(raw)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        DateInput::Date(date)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::DateTime(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_and_datetimes() {
        let midnight = DateInput::from("2024-09-01").resolve().unwrap();
        assert_eq!(midnight.to_string(), "2024-09-01 00:00:00");

        let with_time = DateInput::from("2024-09-01 13:45:00").resolve().unwrap();
        assert_eq!(with_time.to_string(), "2024-09-01 13:45:00");

        let iso = DateInput::from("2024-09-01T13:45:00").resolve().unwrap();
        assert_eq!(iso, with_time);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(DateInput::from("01/09/2024").resolve().is_err());
        assert!(DateInput::from("not a date").resolve().is_err());
    }

    #[test]
    fn chrono_types_pass_through() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert_eq!(
            DateInput::from(date).resolve().unwrap(),
            date.and_hms_opt(0, 0, 0).unwrap()
        );
    }
}

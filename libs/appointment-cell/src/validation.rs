// libs/appointment-cell/src/validation.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::models::FieldError;

const OFFSET_DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%#z",
    "%Y-%m-%dT%H:%M%#z",
];

const NAIVE_DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Largest magnitude an `f64` holds without losing integer precision.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Create body as received; fields stay untyped until [`validate`](Self::validate).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointmentPayload {
    #[serde(default)]
    pub provider_id: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateAppointmentRequest {
    /// `None` when the number is valid but cannot name a user (fractional or
    /// out of range); such a request fails the provider check.
    pub provider_id: Option<i64>,
    pub date: DateTime<Utc>,
}

impl CreateAppointmentPayload {
    /// Checks every field and reports all failures at once.
    pub fn validate(&self) -> Result<CreateAppointmentRequest, Vec<FieldError>> {
        let mut errors = Vec::new();

        let provider_id = match &self.provider_id {
            None => {
                errors.push(FieldError::new("provider_id", "provider_id is required"));
                None
            }
            Some(value) => {
                let parsed = parse_provider_number(value);
                if parsed.is_none() {
                    errors.push(FieldError::new("provider_id", "provider_id must be a number"));
                }
                parsed
            }
        };

        let date = match &self.date {
            None => {
                errors.push(FieldError::new("date", "date is required"));
                None
            }
            Some(value) => {
                let parsed = value.as_str().and_then(parse_iso_date);
                if parsed.is_none() {
                    errors.push(FieldError::new("date", "date must be an ISO-8601 date"));
                }
                parsed
            }
        };

        match (provider_id, date) {
            (Some(provider_id), Some(date)) if errors.is_empty() => {
                Ok(CreateAppointmentRequest { provider_id, date })
            }
            _ => Err(errors),
        }
    }
}

/// Any finite number or numeric string is well formed. The inner value is the
/// user id it names, if any.
fn parse_provider_number(value: &Value) -> Option<Option<i64>> {
    match value {
        Value::Number(number) => Some(
            number
                .as_i64()
                .or_else(|| number.as_f64().and_then(integral_id)),
        ),
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(id) = raw.parse::<i64>() {
                return Some(Some(id));
            }
            raw.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(integral_id)
        }
        _ => None,
    }
}

fn integral_id(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() < MAX_EXACT_FLOAT).then(|| value as i64)
}

/// Parses ISO-8601 date-times with or without an offset. `Z`, `+hh:mm`, `+hhmm`
/// and `+hh` offsets are accepted, as is a space in place of `T`. Times may
/// stop at the hour or minute. Naive date-times and bare dates are read as UTC.
pub fn parse_iso_date(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = normalize_iso_date(raw);
    let normalized = normalized.as_str();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(normalized) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_DATE_TIME_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(normalized, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(normalized, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Rewrites the accepted variants into `YYYY-MM-DDTHH:MM...` with a numeric
/// offset so the format tables above stay small.
fn normalize_iso_date(raw: &str) -> String {
    let mut value = raw.trim().to_string();

    if value.as_bytes().get(10) == Some(&b' ') {
        value.replace_range(10..11, "T");
    }

    if value.len() > 10 && (value.ends_with('Z') || value.ends_with('z')) {
        value.pop();
        value.push_str("+00:00");
    }

    // chrono needs minutes, so an hour-only time gets ":00".
    if value.as_bytes().get(10) == Some(&b'T') && value.get(11..).is_some_and(is_hour_only) {
        value.insert_str(13, ":00");
    }

    value
}

fn is_hour_only(time: &str) -> bool {
    let bytes = time.as_bytes();
    bytes.len() >= 2
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && (bytes.len() == 2 || matches!(bytes[2], b'+' | b'-'))
}

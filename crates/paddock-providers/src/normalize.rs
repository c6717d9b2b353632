//! Shared helpers for turning provider payload fields into normalized values

use chrono::{DateTime, NaiveDateTime, Utc};
use paddock_types::{FetchError, NormalizedRecord, SessionKey, seconds_to_ms};
use serde_json::Value;
use tracing::warn;

use crate::traits::FetchResult;

/// Optional seconds field -> optional milliseconds; bad values are schema errors
pub(crate) fn duration_ms(
    seconds: Option<f64>,
    field: &str,
    context: &str,
) -> FetchResult<Option<u32>> {
    seconds
        .map(|s| seconds_to_ms(s).map_err(|msg| FetchError::schema(format!("{} {}: {}", context, field, msg))))
        .transpose()
}

/// Float lap counters (1.0, 2.0, ...) -> u32
pub(crate) fn whole_number(value: f64, field: &str, context: &str) -> FetchResult<u32> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(FetchError::schema(format!(
            "{} {}: expected positive whole number, got {}",
            context, field, value
        )));
    }
    Ok(value as u32)
}

/// Accepts RFC 3339 as well as naive ISO timestamps, which are taken as UTC
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Driver numbers arrive as either JSON strings or numbers
pub(crate) fn number_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Sort driver-major, lap-minor and drop repeated (driver, lap) rows
pub(crate) fn finalize(key: &SessionKey, provider: &str, mut records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    records.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    let before = records.len();
    records.dedup_by(|later, earlier| later.order_key() == earlier.order_key());
    if records.len() != before {
        warn!(
            provider,
            key = %key,
            dropped = before - records.len(),
            "duplicate lap rows in payload"
        );
    }
    records
}

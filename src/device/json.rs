//! Helpers for the JSON description path.
//!
//! JSON descriptions mirror the binary frames field for field but are not
//! versioned: they always carry the full model, so `from_json(to_json(c))`
//! is the identity.

use serde_json::Value;

use crate::OpenRgbResult;
use crate::error::DecodeError;

fn missing(key: &str, expected: &str) -> DecodeError {
    DecodeError::InvalidValue(format!("JSON field '{key}' missing or not {expected}"))
}

pub(crate) fn json_str(value: &Value, key: &str) -> OpenRgbResult<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| missing(key, "a string").into())
}

pub(crate) fn json_u32(value: &Value, key: &str) -> OpenRgbResult<u32> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| missing(key, "a u32").into())
}

pub(crate) fn json_i32(value: &Value, key: &str) -> OpenRgbResult<i32> {
    value
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| missing(key, "an i32").into())
}

pub(crate) fn json_array<'a>(value: &'a Value, key: &str) -> OpenRgbResult<&'a [Value]> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| missing(key, "an array").into())
}

//! Boolean normalization.
//!
//! ON24 stores flags as `"Y"` / `"N"` strings. Scenario authors write `true` / `false`.
//! Every step input (and every registrant fetched for comparison) goes through this pass
//! so both sides speak the platform's convention.

use serde_json::{Map, Value};

pub const YES_TOKEN: &str = "Y";
pub const NO_TOKEN: &str = "N";

/// Map booleans and `"true"`/`"false"` strings (any case) to `"Y"`/`"N"`, recursing
/// into objects and arrays. Idempotent.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Bool(flag) => yes_no(*flag),
        Value::String(s) if s.eq_ignore_ascii_case("true") => yes_no(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => yes_no(false),
        Value::Object(map) => Value::Object(normalize_booleans(map)),
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        other => other.clone(),
    }
}

/// Normalize every key of a map.
pub fn normalize_booleans(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect()
}

fn yes_no(flag: bool) -> Value {
    Value::String(if flag { YES_TOKEN } else { NO_TOKEN }.to_string())
}

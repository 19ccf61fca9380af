//! Step input.
//!
//! The host sends step data as a dynamically typed map. Handlers read it through
//! [`StepData`], which checks each value against the declared [`FieldType`] at the point
//! of use and reports a [`StepInputError`] instead of trusting the shape.

use super::definition::FieldType;
use crate::operators::normalize_booleans;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reserved key carrying the host's step-ordering counter.
pub const STEP_ORDER_KEY: &str = "__stepOrder";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepInputError {
    #[error("Missing required field '{key}'")]
    MissingField { key: String },
    #[error("Field '{key}' must be {expected:?}, got {actual}")]
    WrongType {
        key: String,
        expected: FieldType,
        actual: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepData {
    values: Map<String, Value>,
}

impl From<Map<String, Value>> for StepData {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl StepData {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Copy with the yes/no boolean pass applied to every key.
    pub fn normalized(&self) -> Self {
        Self {
            values: normalize_booleans(&self.values),
        }
    }

    /// Present, non-null value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn require(&self, key: &str) -> Result<&Value, StepInputError> {
        self.get(key).ok_or_else(|| StepInputError::MissingField {
            key: key.to_string(),
        })
    }

    /// Textual field (string, email, phone, url). Numbers are accepted and rendered.
    pub fn require_str(&self, key: &str) -> Result<String, StepInputError> {
        match self.require(key)? {
            Value::String(s) if !s.is_empty() => Ok(s.clone()),
            Value::String(_) => Err(StepInputError::MissingField {
                key: key.to_string(),
            }),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(wrong_type(key, FieldType::String, other)),
        }
    }

    /// Non-negative integer identifier, given either as a number or a numeric string.
    pub fn require_u64(&self, key: &str) -> Result<u64, StepInputError> {
        let value = self.require(key)?;
        let parsed = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| wrong_type(key, FieldType::Numeric, value))
    }

    pub fn require_map(&self, key: &str) -> Result<&Map<String, Value>, StepInputError> {
        match self.require(key)? {
            Value::Object(map) => Ok(map),
            other => Err(wrong_type(key, FieldType::Map, other)),
        }
    }

    /// Optional scalar; maps and lists are rejected.
    pub fn optional_scalar(&self, key: &str) -> Result<Option<&Value>, StepInputError> {
        match self.get(key) {
            None => Ok(None),
            Some(value @ (Value::Object(_) | Value::Array(_))) => {
                Err(wrong_type(key, FieldType::AnyScalar, value))
            }
            Some(value) => Ok(Some(value)),
        }
    }

    /// Host ordering counter, defaulting to 1.
    pub fn step_order(&self) -> u64 {
        self.require_u64(STEP_ORDER_KEY).unwrap_or(1)
    }
}

fn wrong_type(key: &str, expected: FieldType, actual: &Value) -> StepInputError {
    let actual = match actual {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    };
    StepInputError::WrongType {
        key: key.to_string(),
        expected,
        actual: actual.to_string(),
    }
}

/// One step as received from the host. Consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInvocation {
    pub step_id: String,
    pub data: StepData,
    pub request_id: String,
    pub scenario_id: String,
    pub requestor_id: String,
}

impl StepInvocation {
    pub fn new(step_id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            step_id: step_id.into(),
            data: StepData::new(data),
            request_id: String::new(),
            scenario_id: String::new(),
            requestor_id: String::new(),
        }
    }

    pub fn step_order(&self) -> u64 {
        self.data.step_order()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> StepData {
        match value {
            Value::Object(map) => StepData::new(map),
            _ => panic!("test data must be an object"),
        }
    }

    #[test]
    fn test_require_u64_accepts_numbers_and_numeric_strings() {
        let d = data(json!({ "a": 123, "b": "456", "c": 7.0, "d": 1.5, "e": "x" }));
        assert_eq!(d.require_u64("a").unwrap(), 123);
        assert_eq!(d.require_u64("b").unwrap(), 456);
        assert_eq!(d.require_u64("c").unwrap(), 7);
        assert!(matches!(d.require_u64("d"), Err(StepInputError::WrongType { .. })));
        assert!(matches!(d.require_u64("e"), Err(StepInputError::WrongType { .. })));
        assert!(matches!(d.require_u64("zz"), Err(StepInputError::MissingField { .. })));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let d = data(json!({ "email": null, "empty": "" }));
        assert_eq!(
            d.require_str("email").unwrap_err(),
            StepInputError::MissingField { key: "email".to_string() }
        );
        assert!(d.require_str("empty").is_err());
    }

    #[test]
    fn test_map_and_scalar_checks() {
        let d = data(json!({ "registrant": { "email": "a@b.com" }, "list": [1], "s": "x" }));
        assert_eq!(d.require_map("registrant").unwrap()["email"], json!("a@b.com"));
        assert!(d.require_map("s").is_err());
        assert!(d.optional_scalar("list").is_err());
        assert_eq!(d.optional_scalar("s").unwrap(), Some(&json!("x")));
        assert_eq!(d.optional_scalar("missing").unwrap(), None);
    }

    #[test]
    fn test_step_order_defaults_to_one() {
        assert_eq!(data(json!({})).step_order(), 1);
        assert_eq!(data(json!({ "__stepOrder": 4 })).step_order(), 4);
    }
}

//! # Comparator / Operator Engine
//!
//! Pure evaluation of the named comparison operators that validation steps expose to
//! scenario authors ("should be", "should not contain", "should be one of", ...).
//!
//! ## Coercion
//!
//! - Equality compares numerically when both operands parse as decimal numbers and
//!   falls back to exact text comparison otherwise. Integers compare exactly at any
//!   width up to 128 bits; only fractional values go through `f64`.
//! - Ordering operators require both operands to be numbers, or both to be ISO-8601
//!   dates / date-times. Anything else is an [`OperatorError::InvalidOperand`], never a
//!   silent `false`.
//! - List operators split the expected operand on a separator (comma by default) and
//!   test each member with the same equality as `be`.
//!
//! Values are expected to have been through [`normalize`] first so that caller booleans
//! line up with the platform's `Y`/`N` flags.

pub mod normalize;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use normalize::{normalize_booleans, normalize_value, NO_TOKEN, YES_TOKEN};

/// Separator used by `be one of` / `not be one of` unless configured otherwise.
pub const DEFAULT_LIST_SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperatorError {
    #[error("Unknown operator \"{0}\"")]
    UnknownOperator(String),
    #[error("Cannot apply operator '{operator}' to {actual} and {expected}: operands must both be numbers or both be dates")]
    InvalidOperand {
        operator: String,
        actual: String,
        expected: String,
    },
    #[error("The operator '{0}' requires an expected value")]
    MissingExpectedValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Be,
    NotBe,
    Contain,
    NotContain,
    GreaterThan,
    LessThan,
    Set,
    NotSet,
    OneOf,
    NotOneOf,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Be,
        Operator::NotBe,
        Operator::Contain,
        Operator::NotContain,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::Set,
        Operator::NotSet,
        Operator::OneOf,
        Operator::NotOneOf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Be => "be",
            Operator::NotBe => "not be",
            Operator::Contain => "contain",
            Operator::NotContain => "not contain",
            Operator::GreaterThan => "be greater than",
            Operator::LessThan => "be less than",
            Operator::Set => "be set",
            Operator::NotSet => "not be set",
            Operator::OneOf => "be one of",
            Operator::NotOneOf => "not be one of",
        }
    }

    /// `be set` and `not be set` ignore the expected operand entirely.
    pub fn requires_expected(&self) -> bool {
        !matches!(self, Operator::Set | Operator::NotSet)
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Operator::Be => "The %s field was %s, as expected.",
            Operator::NotBe => "The %s field was not %s, as expected.",
            Operator::Contain => "The %s field contained %s, as expected.",
            Operator::NotContain => "The %s field did not contain %s, as expected.",
            Operator::GreaterThan => "The %s field was greater than %s, as expected.",
            Operator::LessThan => "The %s field was less than %s, as expected.",
            Operator::Set => "The %s field was set, as expected.",
            Operator::NotSet => "The %s field was not set, as expected.",
            Operator::OneOf => "The %s field was one of %s, as expected.",
            Operator::NotOneOf => "The %s field was not one of %s, as expected.",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Operator::Be => "Expected %s field to be %s, but it was actually %s.",
            Operator::NotBe => "Expected %s field not to be %s, but it was also %s.",
            Operator::Contain => "Expected %s field to contain %s, but it is not contained in %s.",
            Operator::NotContain => {
                "Expected %s field not to contain %s, but it is contained in %s."
            }
            Operator::GreaterThan => "Expected %s field to be greater than %s, but it was %s.",
            Operator::LessThan => "Expected %s field to be less than %s, but it was %s.",
            Operator::Set => "Expected %s field to be set, but it was not.",
            Operator::NotSet => "Expected %s field not to be set, but it was set to %s.",
            Operator::OneOf => "Expected %s field to be one of %s, but it was %s.",
            Operator::NotOneOf => "Expected %s field not to be one of %s, but it was %s.",
        }
    }

    /// Comma-joined list of every operator name, for "please provide one of" errors.
    pub fn valid_operator_list() -> String {
        Self::ALL
            .iter()
            .map(Operator::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = OperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| OperatorError::UnknownOperator(s.to_string()))
    }
}

/// Result of evaluating one operator against a named field.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub valid: bool,
    /// Rendered, human readable message.
    pub message: String,
    pub message_format: &'static str,
    pub message_args: Vec<Value>,
}

/// Operator engine with a configurable list separator.
#[derive(Debug, Clone)]
pub struct Comparator {
    list_separator: String,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            list_separator: DEFAULT_LIST_SEPARATOR.to_string(),
        }
    }
}

impl Comparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            list_separator: separator.into(),
        }
    }

    /// Evaluate `operator` for `field` and build the outcome message.
    pub fn evaluate(
        &self,
        field: &str,
        operator: &str,
        actual: &Value,
        expected: Option<&Value>,
    ) -> Result<Evaluation, OperatorError> {
        let op = Operator::from_str(operator)?;
        let valid = self.compare_with(op, actual, expected)?;

        let field_arg = Value::String(field.to_string());
        let expected_arg = expected.cloned().unwrap_or(Value::Null);
        let (message_format, message_args) = match (valid, op) {
            (true, Operator::Set | Operator::NotSet) => (op.success_message(), vec![field_arg]),
            (true, _) => (op.success_message(), vec![field_arg, expected_arg]),
            (false, Operator::Set) => (op.failure_message(), vec![field_arg]),
            (false, Operator::NotSet) => (op.failure_message(), vec![field_arg, actual.clone()]),
            (false, _) => (
                op.failure_message(),
                vec![field_arg, expected_arg, actual.clone()],
            ),
        };

        Ok(Evaluation {
            valid,
            message: render_message(message_format, &message_args),
            message_format,
            message_args,
        })
    }

    /// Lower-level comparison returning only the boolean verdict.
    pub fn compare(
        &self,
        operator: &str,
        actual: &Value,
        expected: Option<&Value>,
    ) -> Result<bool, OperatorError> {
        self.compare_with(Operator::from_str(operator)?, actual, expected)
    }

    fn compare_with(
        &self,
        op: Operator,
        actual: &Value,
        expected: Option<&Value>,
    ) -> Result<bool, OperatorError> {
        let expected = match expected {
            Some(value) if !value.is_null() => Some(value),
            _ => None,
        };

        let expected = match (op.requires_expected(), expected) {
            (true, None) => {
                return Err(OperatorError::MissingExpectedValue(op.as_str().to_string()))
            }
            (_, expected) => expected.unwrap_or(&Value::Null),
        };

        let verdict = match op {
            Operator::Be => values_equal(actual, expected),
            Operator::NotBe => !values_equal(actual, expected),
            Operator::Contain => contains(actual, expected),
            Operator::NotContain => !contains(actual, expected),
            Operator::GreaterThan => ordering(op, actual, expected)? == Ordering::Greater,
            Operator::LessThan => ordering(op, actual, expected)? == Ordering::Less,
            Operator::Set => is_set(actual),
            Operator::NotSet => !is_set(actual),
            Operator::OneOf => self.one_of(actual, expected),
            Operator::NotOneOf => !self.one_of(actual, expected),
        };

        Ok(verdict)
    }

    fn one_of(&self, actual: &Value, expected: &Value) -> bool {
        let Some(candidates) = as_text(expected) else {
            return false;
        };
        candidates
            .split(self.list_separator.as_str())
            .map(|candidate| Value::String(candidate.trim().to_string()))
            .any(|candidate| values_equal(actual, &candidate))
    }
}

/// Evaluate with the default comparator.
pub fn evaluate(
    field: &str,
    operator: &str,
    actual: &Value,
    expected: Option<&Value>,
) -> Result<Evaluation, OperatorError> {
    Comparator::default().evaluate(field, operator, actual, expected)
}

/// Compare with the default comparator.
pub fn compare(operator: &str, actual: &Value, expected: Option<&Value>) -> Result<bool, OperatorError> {
    Comparator::default().compare(operator, actual, expected)
}

/// Substitute `%s` / `%d` placeholders with `args`, in order.
pub fn render_message(format: &str, args: &[Value]) -> String {
    let mut rendered = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            if let Some(&spec) = chars.peek() {
                if spec == 's' || spec == 'd' {
                    chars.next();
                    match args.next() {
                        Some(arg) => rendered.push_str(&display_value(arg)),
                        None => {
                            rendered.push('%');
                            rendered.push(spec);
                        }
                    }
                    continue;
                }
            }
        }
        rendered.push(c);
    }

    rendered
}

/// Plain-text rendering of a value: strings unquoted, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// A numeric operand. Integers stay exact; anything fractional is an `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Integer(i128),
    Decimal(f64),
}

impl Numeric {
    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(number: f64) -> Option<Self> {
        if !number.is_finite() {
            return None;
        }
        if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
            return Some(Numeric::Integer(number as i128));
        }
        Some(Numeric::Decimal(number))
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(i) => i as f64,
            Numeric::Decimal(f) => f,
        }
    }

    fn compare_to(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

/// Largest integer an `f64` holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn as_number(value: &Value) -> Option<Numeric> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .map(Numeric::Integer)
            .or_else(|| n.as_f64().and_then(Numeric::from_f64)),
        Value::String(s) => parse_numeric(s.trim()),
        _ => None,
    }
}

fn parse_numeric(raw: &str) -> Option<Numeric> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(integer) = raw.parse::<i128>() {
        return Some(Numeric::Integer(integer));
    }
    // "42.000" is still the integer 42.
    if let Some((whole, fraction)) = raw.split_once('.') {
        if !fraction.is_empty() && fraction.bytes().all(|b| b == b'0') {
            if let Ok(integer) = whole.parse::<i128>() {
                return Some(Numeric::Integer(integer));
            }
        }
    }
    raw.parse::<f64>().ok().and_then(Numeric::from_f64)
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let Value::String(raw) = value else {
        return None;
    };
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
        return a.compare_to(b) == Some(Ordering::Equal);
    }
    match (as_text(actual), as_text(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match (as_text(actual), as_text(expected)) {
        (Some(haystack), Some(needle)) => haystack.contains(&needle),
        _ => false,
    }
}

fn ordering(op: Operator, actual: &Value, expected: &Value) -> Result<Ordering, OperatorError> {
    if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
        if let Some(order) = a.compare_to(b) {
            return Ok(order);
        }
    }
    if let (Some(a), Some(b)) = (as_datetime(actual), as_datetime(expected)) {
        return Ok(a.cmp(&b));
    }
    Err(OperatorError::InvalidOperand {
        operator: op.as_str().to_string(),
        actual: display_value(actual),
        expected: display_value(expected),
    })
}

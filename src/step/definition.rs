//! Static step metadata: what a step is called, how the host matches it, and which
//! inputs and records it declares.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    Action,
    Validation,
}

/// Semantic type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    AnyScalar,
    String,
    Boolean,
    Numeric,
    Date,
    DateTime,
    Email,
    Phone,
    Url,
    AnyNonScalar,
    Map,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optionality {
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub field_type: FieldType,
    pub optionality: Optionality,
    pub description: String,
    pub help: Option<String>,
    pub bulk_support: bool,
}

impl FieldSpec {
    pub fn required(key: &str, field_type: FieldType, description: &str) -> Self {
        Self {
            key: key.to_string(),
            field_type,
            optionality: Optionality::Required,
            description: description.to_string(),
            help: None,
            bulk_support: false,
        }
    }

    pub fn optional(key: &str, field_type: FieldType, description: &str) -> Self {
        Self {
            optionality: Optionality::Optional,
            ..Self::required(key, field_type, description)
        }
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    KeyValue,
    Table,
    Binary,
}

/// A record a step promises to emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    pub id: String,
    pub shape: RecordShape,
    pub guaranteed_fields: Vec<FieldSpec>,
    pub may_have_more_fields: bool,
}

impl RecordSpec {
    pub fn key_value(id: &str, guaranteed_fields: Vec<FieldSpec>) -> Self {
        Self {
            id: id.to_string(),
            shape: RecordShape::KeyValue,
            guaranteed_fields,
            may_have_more_fields: false,
        }
    }

    pub fn with_dynamic_fields(mut self) -> Self {
        self.may_have_more_fields = true;
        self
    }
}

/// Immutable description of a registered step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub step_id: String,
    pub name: String,
    pub step_type: StepType,
    pub expression: String,
    pub help: String,
    pub expected_fields: Vec<FieldSpec>,
    pub expected_records: Vec<RecordSpec>,
}

impl StepDescriptor {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.expected_fields.iter().find(|f| f.key == key)
    }

    pub fn record(&self, id: &str) -> Option<&RecordSpec> {
        self.expected_records.iter().find(|r| r.id == id)
    }

    /// Field keys must be unique within a step.
    pub fn has_unique_field_keys(&self) -> bool {
        let mut keys: Vec<&str> = self.expected_fields.iter().map(|f| f.key.as_str()).collect();
        keys.sort_unstable();
        keys.windows(2).all(|pair| pair[0] != pair[1])
    }
}

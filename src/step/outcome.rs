//! Step results: the tri-state outcome plus the records a step emits.

use crate::operators::render_message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Passed,
    Failed,
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Error => write!(f, "error"),
        }
    }
}

/// Exactly one payload shape per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordPayload {
    KeyValue(Map<String, Value>),
    Table {
        headers: Map<String, Value>,
        rows: Vec<Map<String, Value>>,
    },
    Binary {
        data: Vec<u8>,
        mime_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: String,
    pub name: String,
    pub payload: RecordPayload,
}

impl ResultRecord {
    pub fn key_value(id: impl Into<String>, name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payload: RecordPayload::KeyValue(fields),
        }
    }

    pub fn table(
        id: impl Into<String>,
        name: impl Into<String>,
        headers: Map<String, Value>,
        rows: Vec<Map<String, Value>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payload: RecordPayload::Table { headers, rows },
        }
    }

    pub fn binary(
        id: impl Into<String>,
        name: impl Into<String>,
        data: Vec<u8>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payload: RecordPayload::Binary {
                data,
                mime_type: mime_type.into(),
            },
        }
    }

    pub fn as_key_value(&self) -> Option<&Map<String, Value>> {
        match &self.payload {
            RecordPayload::KeyValue(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Result of one step execution. Built once, never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub outcome: Outcome,
    pub message_format: String,
    pub message_args: Vec<Value>,
    pub records: Vec<ResultRecord>,
}

impl StepOutcome {
    fn build(outcome: Outcome, message_format: &str, message_args: Vec<Value>) -> Self {
        Self {
            outcome,
            message_format: message_format.to_string(),
            message_args,
            records: Vec::new(),
        }
    }

    pub fn pass(message_format: &str, message_args: Vec<Value>) -> Self {
        Self::build(Outcome::Passed, message_format, message_args)
    }

    pub fn fail(message_format: &str, message_args: Vec<Value>) -> Self {
        Self::build(Outcome::Failed, message_format, message_args)
    }

    pub fn error(message_format: &str, message_args: Vec<Value>) -> Self {
        Self::build(Outcome::Error, message_format, message_args)
    }

    pub fn with_records(mut self, records: Vec<ResultRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn is_passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    /// Message with its arguments substituted.
    pub fn rendered_message(&self) -> String {
        render_message(&self.message_format, &self.message_args)
    }

    pub fn record(&self, id: &str) -> Option<&ResultRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

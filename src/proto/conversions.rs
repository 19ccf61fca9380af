//! Type conversions between the Cog wire types and domain types.
//!
//! `serde_json` is the in-crate representation of dynamic data; `google.protobuf.Struct`
//! is what travels. Protobuf carries every number as a double, so whole numbers coming
//! in are turned back into JSON integers (an event id of `123` stays `123`, not `123.0`).

use crate::proto::v1 as proto;
use crate::step::{
    FieldSpec, FieldType, Optionality, Outcome, RecordPayload, RecordShape, RecordSpec,
    ResultRecord, StepDescriptor, StepInvocation, StepOutcome, StepType,
};
use prost_types::value::Kind;
use serde_json::{Map, Number, Value};

// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

// ============================================================================
// Dynamic value conversions
// ============================================================================

/// Convert a `serde_json::Value` to a `prost_types::Value`.
pub fn json_to_proto_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(map) => Kind::StructValue(map_to_proto_struct(map)),
    };

    prost_types::Value { kind: Some(kind) }
}

/// Convert a `prost_types::Value` to a `serde_json::Value`. A missing kind is null.
pub fn proto_value_to_json(value: &prost_types::Value) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => number_to_json(*n),
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.iter().map(proto_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(proto_struct_to_map(s)),
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Value::Number(Number::from(n as i64));
    }
    // NaN and infinities have no JSON form.
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

pub fn map_to_proto_struct(map: &Map<String, Value>) -> prost_types::Struct {
    prost_types::Struct {
        fields: map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
            .collect(),
    }
}

pub fn proto_struct_to_map(s: &prost_types::Struct) -> Map<String, Value> {
    s.fields
        .iter()
        .map(|(k, v)| (k.clone(), proto_value_to_json(v)))
        .collect()
}

// ============================================================================
// Step metadata -> proto
// ============================================================================

impl From<StepType> for proto::step_definition::Type {
    fn from(step_type: StepType) -> Self {
        match step_type {
            StepType::Action => proto::step_definition::Type::Action,
            StepType::Validation => proto::step_definition::Type::Validation,
        }
    }
}

impl From<FieldType> for proto::field_definition::Type {
    fn from(field_type: FieldType) -> Self {
        use proto::field_definition::Type;
        match field_type {
            FieldType::AnyScalar => Type::Anyscalar,
            FieldType::String => Type::String,
            FieldType::Boolean => Type::Boolean,
            FieldType::Numeric => Type::Numeric,
            FieldType::Date => Type::Date,
            FieldType::DateTime => Type::Datetime,
            FieldType::Email => Type::Email,
            FieldType::Phone => Type::Phone,
            FieldType::Url => Type::Url,
            FieldType::AnyNonScalar => Type::Anynonscalar,
            FieldType::Map => Type::Map,
        }
    }
}

impl From<Optionality> for proto::field_definition::Optionality {
    fn from(optionality: Optionality) -> Self {
        match optionality {
            Optionality::Required => proto::field_definition::Optionality::Required,
            Optionality::Optional => proto::field_definition::Optionality::Optional,
        }
    }
}

impl From<RecordShape> for proto::record_definition::Type {
    fn from(shape: RecordShape) -> Self {
        match shape {
            RecordShape::KeyValue => proto::record_definition::Type::Keyvalue,
            RecordShape::Table => proto::record_definition::Type::Table,
            RecordShape::Binary => proto::record_definition::Type::Binary,
        }
    }
}

impl From<&FieldSpec> for proto::FieldDefinition {
    fn from(field: &FieldSpec) -> Self {
        proto::FieldDefinition {
            key: field.key.clone(),
            optionality: proto::field_definition::Optionality::from(field.optionality) as i32,
            r#type: proto::field_definition::Type::from(field.field_type) as i32,
            description: field.description.clone(),
            help: field.help.clone().unwrap_or_default(),
            bulksupport: field.bulk_support,
        }
    }
}

impl From<&RecordSpec> for proto::RecordDefinition {
    fn from(record: &RecordSpec) -> Self {
        proto::RecordDefinition {
            id: record.id.clone(),
            r#type: proto::record_definition::Type::from(record.shape) as i32,
            guaranteed_fields: record.guaranteed_fields.iter().map(Into::into).collect(),
            may_have_more_fields: record.may_have_more_fields,
        }
    }
}

impl From<&StepDescriptor> for proto::StepDefinition {
    fn from(descriptor: &StepDescriptor) -> Self {
        proto::StepDefinition {
            step_id: descriptor.step_id.clone(),
            name: descriptor.name.clone(),
            r#type: proto::step_definition::Type::from(descriptor.step_type) as i32,
            expression: descriptor.expression.clone(),
            expected_fields: descriptor.expected_fields.iter().map(Into::into).collect(),
            expected_records: descriptor.expected_records.iter().map(Into::into).collect(),
            help: descriptor.help.clone(),
        }
    }
}

// ============================================================================
// Step outcome -> proto
// ============================================================================

impl From<Outcome> for proto::run_step_response::Outcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => proto::run_step_response::Outcome::Passed,
            Outcome::Failed => proto::run_step_response::Outcome::Failed,
            Outcome::Error => proto::run_step_response::Outcome::Error,
        }
    }
}

impl From<ResultRecord> for proto::StepRecord {
    fn from(record: ResultRecord) -> Self {
        let value = match record.payload {
            RecordPayload::KeyValue(fields) => {
                proto::step_record::Value::KeyValue(map_to_proto_struct(&fields))
            }
            RecordPayload::Table { headers, rows } => {
                proto::step_record::Value::Table(proto::TableRecord {
                    headers: Some(map_to_proto_struct(&headers)),
                    rows: rows.iter().map(map_to_proto_struct).collect(),
                })
            }
            RecordPayload::Binary { data, mime_type } => {
                proto::step_record::Value::Binary(proto::BinaryRecord { data, mime_type })
            }
        };

        proto::StepRecord {
            id: record.id,
            name: record.name,
            value: Some(value),
        }
    }
}

impl From<StepOutcome> for proto::RunStepResponse {
    fn from(outcome: StepOutcome) -> Self {
        proto::RunStepResponse {
            outcome: proto::run_step_response::Outcome::from(outcome.outcome) as i32,
            message_format: outcome.message_format,
            message_args: outcome.message_args.iter().map(json_to_proto_value).collect(),
            response_data: None,
            records: outcome.records.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// proto -> Step invocation
// ============================================================================

impl From<proto::RunStepRequest> for StepInvocation {
    fn from(request: proto::RunStepRequest) -> Self {
        let (step_id, data) = match request.step {
            Some(step) => (
                step.step_id,
                step.data.as_ref().map(proto_struct_to_map).unwrap_or_default(),
            ),
            None => (String::new(), Map::new()),
        };

        StepInvocation {
            request_id: request.request_id,
            scenario_id: request.scenario_id,
            requestor_id: request.requestor_id,
            ..StepInvocation::new(step_id, data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_numbers_come_back_as_integers() {
        let value = proto_value_to_json(&json_to_proto_value(&json!(123)));
        assert_eq!(value, json!(123));
        assert!(value.is_i64());

        assert_eq!(number_to_json(1.5), json!(1.5));
        assert_eq!(number_to_json(-42.0), json!(-42));
        assert_eq!(number_to_json(f64::NAN), Value::Null);
        assert!(number_to_json(1e300).is_f64());
    }

    #[test]
    fn test_nested_struct_conversion() {
        let original = json!({
            "eventId": 5,
            "registrant": { "email": "a@b.com", "optin": "Y", "tags": ["x", null, true] },
        });
        let Value::Object(map) = original.clone() else { unreachable!() };

        let back = proto_struct_to_map(&map_to_proto_struct(&map));
        assert_eq!(Value::Object(back), original);
    }

    #[test]
    fn test_missing_kind_is_null() {
        assert_eq!(proto_value_to_json(&prost_types::Value { kind: None }), Value::Null);
    }

    #[test]
    fn test_descriptor_to_step_definition() {
        let descriptor = StepDescriptor {
            step_id: "DiscoverRegistrant".to_string(),
            name: "Discover".to_string(),
            step_type: StepType::Validation,
            expression: "discover (?<email>.+)".to_string(),
            help: "help".to_string(),
            expected_fields: vec![
                FieldSpec::required("email", FieldType::Email, "Email").with_help("h"),
                FieldSpec::optional("expectedValue", FieldType::AnyScalar, "Expected"),
            ],
            expected_records: vec![RecordSpec::key_value(
                "registrant",
                vec![FieldSpec::required("createtimestamp", FieldType::DateTime, "Created")],
            )
            .with_dynamic_fields()],
        };

        let def = proto::StepDefinition::from(&descriptor);
        assert_eq!(def.step_id, "DiscoverRegistrant");
        assert_eq!(def.r#type, proto::step_definition::Type::Validation as i32);
        assert_eq!(def.expected_fields[0].r#type, proto::field_definition::Type::Email as i32);
        assert_eq!(def.expected_fields[0].help, "h");
        assert_eq!(
            def.expected_fields[1].optionality,
            proto::field_definition::Optionality::Optional as i32
        );
        assert_eq!(def.expected_fields[1].help, "");
        assert!(def.expected_records[0].may_have_more_fields);
        assert_eq!(
            def.expected_records[0].guaranteed_fields[0].r#type,
            proto::field_definition::Type::Datetime as i32
        );
    }

    #[test]
    fn test_outcome_to_response() {
        let mut fields = Map::new();
        fields.insert("email".to_string(), json!("a@b.com"));
        let outcome = StepOutcome::fail("Expected %s to be %s", vec![json!("f"), json!(3)])
            .with_records(vec![
                ResultRecord::key_value("registrant", "Registrant", fields),
                ResultRecord::binary("screenshot", "Screenshot", vec![1, 2, 3], "image/png"),
            ]);

        let response = proto::RunStepResponse::from(outcome);
        assert_eq!(response.outcome, proto::run_step_response::Outcome::Failed as i32);
        assert_eq!(response.message_format, "Expected %s to be %s");
        assert_eq!(response.message_args.len(), 2);
        assert!(response.response_data.is_none());
        assert!(matches!(
            response.records[0].value,
            Some(proto::step_record::Value::KeyValue(_))
        ));
        assert!(matches!(
            &response.records[1].value,
            Some(proto::step_record::Value::Binary(b)) if b.mime_type == "image/png"
        ));
    }

    #[test]
    fn test_request_to_invocation() {
        let Value::Object(data) = json!({ "email": "a@b.com", "eventId": 9 }) else {
            unreachable!()
        };
        let request = proto::RunStepRequest {
            step: Some(proto::Step {
                step_id: "ForgetRegistrant".to_string(),
                data: Some(map_to_proto_struct(&data)),
            }),
            request_id: "req-1".to_string(),
            scenario_id: "scn-1".to_string(),
            requestor_id: "usr-1".to_string(),
        };

        let invocation = StepInvocation::from(request);
        assert_eq!(invocation.step_id, "ForgetRegistrant");
        assert_eq!(invocation.request_id, "req-1");
        assert_eq!(invocation.data.require_u64("eventId").unwrap(), 9);

        let empty = StepInvocation::from(proto::RunStepRequest::default());
        assert_eq!(empty.step_id, "");
        assert!(empty.data.as_map().is_empty());
    }
}

//! Validation step: assert on one field of an event registrant.

use super::{ordered_record, registrant_record_spec, ERROR_CONNECTING};
use crate::client::RegistrantAware;
use crate::operators::{normalize_booleans, Comparator, Operator, OperatorError};
use crate::step::{
    input_error, CogStep, FieldSpec, FieldType, ResultRecord, StepDescriptor, StepInputError,
    StepInvocation, StepOutcome, StepType,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub struct CheckRegistrantField {
    client: Arc<dyn RegistrantAware>,
    comparator: Comparator,
}

struct CheckInputs {
    event_id: u64,
    email: String,
    field: String,
    operator: String,
    expected: Option<Value>,
}

impl CheckRegistrantField {
    pub const STEP_ID: &'static str = "CheckRegistrantField";

    pub fn new(client: Arc<dyn RegistrantAware>) -> Self {
        Self {
            client,
            comparator: Comparator::default(),
        }
    }

    pub fn descriptor() -> StepDescriptor {
        StepDescriptor {
            step_id: Self::STEP_ID.to_string(),
            name: "Check a field on an ON24 registrant".to_string(),
            step_type: StepType::Validation,
            expression: "the (?<field>.+) field on ON24 registrant (?<email>.+) for event (?<eventId>\\d+) should (?<operator>be set|not be set|be less than|be greater than|be one of|be|contain|not be one of|not be|not contain) ?(?<expectedValue>.+)?".to_string(),
            help: "This step attempts to find an event registrant for the given event ID and email, then checks the value of a specified registrant field.".to_string(),
            expected_fields: vec![
                FieldSpec::required("email", FieldType::Email, "Registrant's email address")
                    .with_help("This email address is used to find the ON24 registrant."),
                FieldSpec::required("eventId", FieldType::Numeric, "Event ID").with_help(
                    "This ID is used to find the ON24 registrant. Event IDs can be found in your ON24 event dashboard.",
                ),
                FieldSpec::required("field", FieldType::String, "Field name to check"),
                FieldSpec::required(
                    "operator",
                    FieldType::String,
                    "Check Logic (be, not be, contain, not contain, be greater than, be less than, be set, not be set, be one of, or not be one of)",
                ),
                FieldSpec::optional("expectedValue", FieldType::AnyScalar, "Expected field value"),
            ],
            expected_records: vec![registrant_record_spec("registrant", true)],
        }
    }

    fn read_inputs(invocation: &StepInvocation) -> Result<CheckInputs, StepInputError> {
        let data = invocation.data.normalized();
        Ok(CheckInputs {
            event_id: data.require_u64("eventId")?,
            email: data.require_str("email")?,
            field: data.require_str("field")?,
            operator: data.require_str("operator")?.to_lowercase(),
            expected: data.optional_scalar("expectedValue")?.cloned(),
        })
    }
}

fn operator_error(error: &OperatorError) -> StepOutcome {
    match error {
        OperatorError::UnknownOperator(_) => StepOutcome::error(
            "%s. Please provide one of: %s",
            vec![json!(error.to_string()), json!(Operator::valid_operator_list())],
        ),
        OperatorError::MissingExpectedValue(operator) => StepOutcome::error(
            "The operator '%s' requires an expected value. Please provide one.",
            vec![json!(operator)],
        ),
        OperatorError::InvalidOperand { .. } => {
            StepOutcome::error("%s", vec![json!(error.to_string())])
        }
    }
}

#[async_trait]
impl CogStep for CheckRegistrantField {
    fn definition(&self) -> StepDescriptor {
        Self::descriptor()
    }

    async fn execute_step(&self, invocation: &StepInvocation) -> StepOutcome {
        let inputs = match Self::read_inputs(invocation) {
            Ok(inputs) => inputs,
            Err(e) => return input_error(&e),
        };

        // Operator problems are caller errors; report them before touching ON24.
        match Operator::from_str(&inputs.operator) {
            Err(e) => return operator_error(&e),
            Ok(op) if op.requires_expected() && inputs.expected.is_none() => {
                return operator_error(&OperatorError::MissingExpectedValue(
                    op.as_str().to_string(),
                ))
            }
            Ok(_) => {}
        }

        let registrants = match self
            .client
            .get_event_registrant_by_email(inputs.event_id, &inputs.email)
            .await
        {
            Ok(registrants) => registrants,
            Err(e) => return StepOutcome::error(ERROR_CONNECTING, vec![json!(e.to_string())]),
        };

        // A missing registrant is an operational problem here, not an assertion failure.
        let Some(registrant) = registrants.first() else {
            return StepOutcome::error(
                "No registrant found for event %d and email %s",
                vec![json!(inputs.event_id), json!(inputs.email)],
            );
        };

        let registrant = normalize_booleans(registrant);
        let actual = registrant.get(&inputs.field).cloned().unwrap_or(Value::Null);
        debug!(field = %inputs.field, operator = %inputs.operator, "Evaluating registrant field");

        let evaluation = match self.comparator.evaluate(
            &inputs.field,
            &inputs.operator,
            &actual,
            inputs.expected.as_ref(),
        ) {
            Ok(evaluation) => evaluation,
            Err(e) => return operator_error(&e),
        };

        let order = invocation.step_order();
        let records = vec![
            ResultRecord::key_value("registrant", "Registrant Record", registrant.clone()),
            ordered_record("registrant", "Registrant Record", &registrant, order),
        ];

        let outcome = if evaluation.valid {
            StepOutcome::pass(evaluation.message_format, evaluation.message_args)
        } else {
            StepOutcome::fail(evaluation.message_format, evaluation.message_args)
        };
        outcome.with_records(records)
    }
}

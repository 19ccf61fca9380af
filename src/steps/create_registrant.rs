//! Action step: register someone for an event, then read them back.

use super::{ordered_record, registrant_record_spec, ERROR_CONNECTING};
use crate::client::{Registrant, RegistrantAware};
use crate::step::{
    input_error, CogStep, FieldSpec, FieldType, ResultRecord, StepDescriptor, StepInputError,
    StepInvocation, StepOutcome, StepType,
};
use async_trait::async_trait;
use serde_json::{json, Map};
use std::sync::Arc;
use tracing::{debug, warn};

const ERROR_CREATING: &str = "There was a problem creating the ON24 registrant: %s";

pub struct CreateRegistrant {
    client: Arc<dyn RegistrantAware>,
}

impl CreateRegistrant {
    pub const STEP_ID: &'static str = "CreateRegistrant";

    pub fn new(client: Arc<dyn RegistrantAware>) -> Self {
        Self { client }
    }

    pub fn descriptor() -> StepDescriptor {
        StepDescriptor {
            step_id: Self::STEP_ID.to_string(),
            name: "Create an ON24 registrant".to_string(),
            step_type: StepType::Action,
            expression: "create an ON24 registrant for event (?<eventId>\\d+)".to_string(),
            help: "This step attempts to create a registrant for the given event ID.".to_string(),
            expected_fields: vec![
                FieldSpec::required("eventId", FieldType::Numeric, "Event ID").with_help(
                    "This ID is used to identify the ON24 event. Event IDs can be found in your ON24 event dashboard.",
                ),
                FieldSpec::required(
                    "registrant",
                    FieldType::Map,
                    "A Map of registrant fields and their values.",
                )
                .with_help(
                    "All required fields for this event must be included, or else the step will result in an error.",
                ),
            ],
            expected_records: vec![registrant_record_spec("registrant", true)],
        }
    }

    fn read_inputs(invocation: &StepInvocation) -> Result<(u64, Registrant, String), StepInputError> {
        let data = invocation.data.normalized();
        let event_id = data.require_u64("eventId")?;
        let registrant = data.require_map("registrant")?.clone();
        let email = registrant
            .get("email")
            .and_then(|v| v.as_str())
            .filter(|email| !email.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StepInputError::MissingField {
                key: "registrant.email".to_string(),
            })?;
        Ok((event_id, registrant, email))
    }
}

/// Persisted values restricted to the keys the caller supplied.
fn exposed_fields(supplied: &Registrant, persisted: &Registrant) -> Registrant {
    supplied
        .iter()
        .map(|(key, value)| {
            let value = persisted.get(key).unwrap_or(value);
            (key.clone(), value.clone())
        })
        .collect::<Map<_, _>>()
}

#[async_trait]
impl CogStep for CreateRegistrant {
    fn definition(&self) -> StepDescriptor {
        Self::descriptor()
    }

    async fn execute_step(&self, invocation: &StepInvocation) -> StepOutcome {
        let (event_id, registrant, email) = match Self::read_inputs(invocation) {
            Ok(inputs) => inputs,
            Err(e) => return input_error(&e),
        };

        if let Err(e) = self.client.create_event_registrant(event_id, &registrant).await {
            return StepOutcome::error(ERROR_CREATING, vec![json!(e.to_string())]);
        }
        debug!(event_id, "Registrant created, reading back persisted record");

        // The create response is not a complete view of the registrant.
        let persisted = match self.client.get_event_registrant_by_email(event_id, &email).await {
            Ok(registrants) => registrants,
            Err(e) => return StepOutcome::error(ERROR_CONNECTING, vec![json!(e.to_string())]),
        };
        let Some(persisted) = persisted.into_iter().next() else {
            warn!(event_id, "Created registrant not found on read-back");
            return StepOutcome::error(
                "Registrant %s was created but could not be found for event %d",
                vec![json!(email), json!(event_id)],
            );
        };

        let order = invocation.step_order();
        let records = vec![
            ResultRecord::key_value("registrant", "Created Registrant", persisted.clone()),
            ResultRecord::key_value(
                "exposeOnPass:registrant",
                "Created Registrant",
                exposed_fields(&registrant, &persisted),
            ),
            ordered_record("registrant", "Created Registrant", &persisted, order),
        ];

        StepOutcome::pass(
            "Successfully created registrant %s for event %d.",
            vec![json!(email), json!(event_id)],
        )
        .with_records(records)
    }
}

//! Action step: expose every field of a registrant as records.

use super::{ordered_record, registrant_record_spec, ERROR_CONNECTING};
use crate::client::RegistrantAware;
use crate::step::{
    input_error, CogStep, FieldSpec, FieldType, ResultRecord, StepDescriptor, StepInvocation,
    StepOutcome, StepType,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const RECORD_ID: &str = "discoverRegistrant";
const RECORD_NAME: &str = "Discovered Registrant";

pub struct DiscoverRegistrant {
    client: Arc<dyn RegistrantAware>,
}

impl DiscoverRegistrant {
    pub const STEP_ID: &'static str = "DiscoverRegistrant";

    pub fn new(client: Arc<dyn RegistrantAware>) -> Self {
        Self { client }
    }

    pub fn descriptor() -> StepDescriptor {
        StepDescriptor {
            step_id: Self::STEP_ID.to_string(),
            name: "Discover fields on an ON24 registrant".to_string(),
            step_type: StepType::Action,
            expression: "discover fields on ON24 registrant (?<email>.+)".to_string(),
            help: "This step finds an event registrant by email and reports every field on it."
                .to_string(),
            expected_fields: vec![
                FieldSpec::required("email", FieldType::Email, "Registrant's email address")
                    .with_help("This email address is used to find the ON24 registrant."),
                FieldSpec::required("eventId", FieldType::Numeric, "Event ID").with_help(
                    "This ID is used to find the ON24 registrant. Event IDs can be found in your ON24 event dashboard.",
                ),
            ],
            expected_records: vec![registrant_record_spec(RECORD_ID, true)],
        }
    }
}

#[async_trait]
impl CogStep for DiscoverRegistrant {
    fn definition(&self) -> StepDescriptor {
        Self::descriptor()
    }

    async fn execute_step(&self, invocation: &StepInvocation) -> StepOutcome {
        let data = invocation.data.normalized();
        let inputs = data
            .require_str("email")
            .and_then(|email| Ok((email, data.require_u64("eventId")?)));
        let (email, event_id) = match inputs {
            Ok(inputs) => inputs,
            Err(e) => return input_error(&e),
        };

        let registrants = match self
            .client
            .get_event_registrant_by_email(event_id, &email)
            .await
        {
            Ok(registrants) => registrants,
            Err(e) => return StepOutcome::error(ERROR_CONNECTING, vec![json!(e.to_string())]),
        };

        // Not finding anyone is a legitimate answer for discovery.
        let Some(registrant) = registrants.into_iter().next() else {
            return StepOutcome::fail(
                "No registrant found for event %d and email %s",
                vec![json!(event_id), json!(email)],
            );
        };

        let order = invocation.step_order();
        let records = vec![
            ResultRecord::key_value(RECORD_ID, RECORD_NAME, registrant.clone()),
            ordered_record(RECORD_ID, RECORD_NAME, &registrant, order),
        ];
        StepOutcome::pass("Successfully discovered fields on registrant", vec![])
            .with_records(records)
    }
}

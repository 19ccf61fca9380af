//! Action step: remove a registrant from an event.

use super::registrant_record_spec;
use crate::client::RegistrantAware;
use crate::step::{
    input_error, CogStep, FieldSpec, FieldType, ResultRecord, StepDescriptor, StepInvocation,
    StepOutcome, StepType,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub struct ForgetRegistrant {
    client: Arc<dyn RegistrantAware>,
}

impl ForgetRegistrant {
    pub const STEP_ID: &'static str = "ForgetRegistrant";

    pub fn new(client: Arc<dyn RegistrantAware>) -> Self {
        Self { client }
    }

    pub fn descriptor() -> StepDescriptor {
        StepDescriptor {
            step_id: Self::STEP_ID.to_string(),
            name: "Forget an ON24 registrant".to_string(),
            step_type: StepType::Action,
            expression: "forget that (?<email>.+) registered for ON24 event (?<eventId>\\d+)"
                .to_string(),
            help: "This step attempts to \"forget\" (or delete) a registrant for the given event ID."
                .to_string(),
            expected_fields: vec![
                FieldSpec::required("email", FieldType::Email, "Registrant's email address")
                    .with_help(
                        "This email address is used to identify the ON24 registrant who should be forgotten / deleted.",
                    ),
                FieldSpec::required("eventId", FieldType::Numeric, "Event ID").with_help(
                    "This ID is used to identify the ON24 event that this registrant should be removed from.",
                ),
            ],
            expected_records: vec![registrant_record_spec("registrant", false)],
        }
    }
}

#[async_trait]
impl CogStep for ForgetRegistrant {
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

        let forgotten = match self
            .client
            .forget_event_registrant_by_email(event_id, &email)
            .await
        {
            Ok(forgotten) => forgotten,
            Err(e) => {
                return StepOutcome::error(
                    "There was a problem forgetting the ON24 registrant: %s",
                    vec![json!(e.to_string())],
                )
            }
        };

        // Only identifiers come back; the record is assembled from what we know.
        let mut record = Map::new();
        record.insert("email".to_string(), json!(email));
        record.insert(
            "eventuserid".to_string(),
            forgotten.event_user_ids.first().cloned().unwrap_or(Value::Null),
        );

        StepOutcome::pass(
            "Successfully forgot registrant %s for event %d.",
            vec![json!(email), json!(event_id)],
        )
        .with_records(vec![ResultRecord::key_value(
            "registrant",
            "Forgotten Registrant",
            record,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Outcome;
    use crate::test_support::MockRegistrantClient;

    fn invocation(data: Value) -> StepInvocation {
        let Value::Object(map) = data else { panic!("object expected") };
        StepInvocation::new(ForgetRegistrant::STEP_ID, map)
    }

    #[test]
    fn test_step_metadata() {
        let def = ForgetRegistrant::descriptor();
        assert_eq!(def.step_id, "ForgetRegistrant");
        assert_eq!(def.step_type, StepType::Action);
        assert_eq!(def.expected_fields.len(), 2);
        assert_eq!(def.record("registrant").unwrap().guaranteed_fields.len(), 2);
    }

    #[tokio::test]
    async fn test_forget_builds_record_from_returned_id() {
        let client = MockRegistrantClient::new().with_forget(vec![json!(112233)]);
        let outcome = ForgetRegistrant::new(Arc::new(client))
            .execute_step(&invocation(json!({ "email": "gone@example.com", "eventId": 9 })))
            .await;

        assert_eq!(outcome.outcome, Outcome::Passed);
        assert_eq!(
            outcome.rendered_message(),
            "Successfully forgot registrant gone@example.com for event 9."
        );
        let record = outcome.record("registrant").unwrap().as_key_value().unwrap();
        assert_eq!(record.get("email"), Some(&json!("gone@example.com")));
        assert_eq!(record.get("eventuserid"), Some(&json!(112233)));
    }

    #[tokio::test]
    async fn test_forget_error_surfaces_as_error() {
        let client = MockRegistrantClient::new().with_forget_error("registrant not found");
        let outcome = ForgetRegistrant::new(Arc::new(client))
            .execute_step(&invocation(json!({ "email": "a@b.com", "eventId": 9 })))
            .await;

        assert_eq!(outcome.outcome, Outcome::Error);
        assert!(outcome.rendered_message().contains("registrant not found"));
    }

    #[tokio::test]
    async fn test_event_id_must_be_numeric() {
        let outcome = ForgetRegistrant::new(Arc::new(MockRegistrantClient::new()))
            .execute_step(&invocation(json!({ "email": "a@b.com", "eventId": "abc" })))
            .await;
        assert_eq!(outcome.outcome, Outcome::Error);
    }
}

//! Request and metadata builders shared by the integration tests.

use on24_cog::proto::conversions::map_to_proto_struct;
use on24_cog::proto::v1 as proto;
use serde_json::{Map, Value};
use tonic::metadata::MetadataMap;

pub const CLIENT_ID: &str = "12345";
pub const TOKEN_KEY: &str = "test-token-key";
pub const TOKEN_SECRET: &str = "test-token-secret";

/// Metadata carrying a complete, valid credential set.
pub fn credentials() -> MetadataMap {
    let mut metadata = MetadataMap::new();
    apply_credentials(&mut metadata);
    metadata
}

pub fn apply_credentials(metadata: &mut MetadataMap) {
    metadata.insert("clientid", CLIENT_ID.parse().unwrap());
    metadata.insert("tokenkey", TOKEN_KEY.parse().unwrap());
    metadata.insert("tokensecret", TOKEN_SECRET.parse().unwrap());
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn step_request(step_id: &str, data: Value) -> proto::RunStepRequest {
    proto::RunStepRequest {
        step: Some(proto::Step {
            step_id: step_id.to_string(),
            data: Some(map_to_proto_struct(&object(data))),
        }),
        request_id: format!("req-{step_id}"),
        scenario_id: "scenario-1".to_string(),
        requestor_id: "tester".to_string(),
    }
}

pub fn outcome_of(response: &proto::RunStepResponse) -> proto::run_step_response::Outcome {
    proto::run_step_response::Outcome::try_from(response.outcome)
        .expect("response carries a known outcome")
}

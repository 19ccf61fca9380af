//! Real tonic round trips over a loopback socket.

mod common;

use common::*;
use on24_cog::config::{CogIdentity, ServerConfig};
use on24_cog::grpc::GrpcServer;
use on24_cog::proto::conversions::proto_value_to_json;
use on24_cog::proto::v1::cog_service_client::CogServiceClient;
use on24_cog::proto::v1::run_step_response::Outcome as WireOutcome;
use on24_cog::proto::v1::{step_definition, ManifestRequest};
use on24_cog::{Cog, StepRegistry};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Channel;
use tonic::Request;

struct TestServer {
    addr: SocketAddr,
    store: Arc<InMemoryRegistrants>,
    factory: Arc<InMemoryClientFactory>,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<on24_cog::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let store = Arc::new(InMemoryRegistrants::new());
        let factory = Arc::new(InMemoryClientFactory::new(store.clone()));
        let cog = Cog::new(
            CogIdentity::default(),
            StepRegistry::with_default_steps(),
            factory.clone(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let config = ServerConfig {
            bind_address: addr.to_string(),
            enable_reflection: true,
            ..ServerConfig::default()
        };
        let handle = tokio::spawn(async move {
            GrpcServer::new(config, cog)
                .serve_with_listener(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Self {
            addr,
            store,
            factory,
            shutdown,
            handle,
        }
    }

    async fn client(&self) -> CogServiceClient<Channel> {
        CogServiceClient::connect(format!("http://{}", self.addr))
            .await
            .unwrap()
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn manifest_over_the_wire() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let manifest = client
        .get_manifest(ManifestRequest {})
        .await
        .unwrap()
        .into_inner();

    assert_eq!(manifest.name, "stackmoxie/on24");
    assert_eq!(manifest.step_definitions.len(), 4);
    assert_eq!(manifest.auth_fields.len(), 3);
    let check = manifest
        .step_definitions
        .iter()
        .find(|d| d.step_id == "CheckRegistrantField")
        .unwrap();
    assert_eq!(check.r#type, step_definition::Type::Validation as i32);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn run_step_reads_credentials_from_metadata() {
    let server = TestServer::start().await;
    server.store.seed(
        77,
        json!({ "email": "wire@example.com", "eventuserid": 5, "company": "Acme" }),
    );
    let mut client = server.client().await;

    let mut request = Request::new(step_request(
        "DiscoverRegistrant",
        json!({ "eventId": 77, "email": "wire@example.com" }),
    ));
    apply_credentials(request.metadata_mut());
    let response = client.run_step(request).await.unwrap().into_inner();

    assert_eq!(outcome_of(&response), WireOutcome::Passed);
    assert_eq!(response.records[0].id, "discoverRegistrant");

    // Without credentials the step still answers, as an ERROR outcome.
    let response = client
        .run_step(step_request(
            "DiscoverRegistrant",
            json!({ "eventId": 77, "email": "wire@example.com" }),
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(outcome_of(&response), WireOutcome::Error);
    assert_eq!(server.factory.construction_count(), 2);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn run_steps_streams_outcomes_in_order() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let requests = vec![
        step_request(
            "CreateRegistrant",
            json!({ "eventId": 9, "registrant": { "email": "s@example.com" } }),
        ),
        step_request("Bogus", json!({})),
        step_request(
            "CheckRegistrantField",
            json!({
                "eventId": 9, "email": "s@example.com",
                "field": "eventuserid", "operator": "be greater than", "expectedValue": 0,
            }),
        ),
    ];
    let mut request = Request::new(tokio_stream::iter(requests));
    apply_credentials(request.metadata_mut());

    let mut stream = client.run_steps(request).await.unwrap().into_inner();
    let mut responses = Vec::new();
    while let Some(response) = stream.message().await.unwrap() {
        responses.push(response);
    }

    let outcomes: Vec<WireOutcome> = responses.iter().map(outcome_of).collect();
    assert_eq!(
        outcomes,
        vec![WireOutcome::Passed, WireOutcome::Error, WireOutcome::Passed]
    );
    assert_eq!(
        proto_value_to_json(&responses[1].message_args[0]),
        json!("Bogus")
    );
    assert_eq!(server.factory.construction_count(), 1);

    drop(stream);
    drop(client);
    server.stop().await;
}

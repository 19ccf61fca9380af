//! # Cog Dispatcher
//!
//! Implements the `CogService` RPCs on top of the step registry.
//!
//! ## Call-scopes
//!
//! Every `RunStep` call and every `RunSteps` stream is one [`CallScope`]. The scope
//! builds its client from the call's credential metadata on the first message, keeps
//! the result (success or failure) for its lifetime, and runs steps strictly one at a
//! time in arrival order. Scopes share nothing but the read-only registry, so
//! independent calls run fully in parallel.
//!
//! ## Failure policy
//!
//! No RPC fails at the transport level because of a step. Unknown steps, failed
//! authentication and handler panics all come back as ERROR outcomes.

use crate::client::{expected_auth_fields, ClientFactory, On24ClientFactory, RegistrantAware};
use crate::config::{CogConfig, CogIdentity};
use crate::error::Result;
use crate::logging::{log_error, log_step_operation};
use crate::proto::v1 as proto;
use crate::proto::v1::cog_service_server::CogService;
use crate::step::{StepInvocation, StepOutcome};
use crate::steps::StepRegistry;
use futures::{FutureExt, Stream, StreamExt};
use serde_json::json;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, instrument, warn};

// Outcomes buffered ahead of a slow reader before the stream applies backpressure.
const STREAM_BUFFER: usize = 16;

pub type ResponseStream = ReceiverStream<std::result::Result<proto::RunStepResponse, Status>>;

/// The Cog service: identity, registry and the per-scope client factory.
#[derive(Clone)]
pub struct Cog {
    identity: CogIdentity,
    registry: Arc<StepRegistry>,
    client_factory: Arc<dyn ClientFactory>,
}

impl fmt::Debug for Cog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cog")
            .field("name", &self.identity.name)
            .field("version", &self.identity.version)
            .field("registry", &self.registry)
            .field("client_factory", &self.client_factory)
            .finish()
    }
}

impl Cog {
    pub fn new(
        identity: CogIdentity,
        registry: StepRegistry,
        client_factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            identity,
            registry: Arc::new(registry),
            client_factory,
        }
    }

    /// Production Cog: the four registrant steps against the configured ON24 API.
    pub fn from_config(config: &CogConfig) -> Result<Self> {
        let factory = On24ClientFactory::new(&config.api.base_url)?;
        Ok(Self::new(
            config.cog.clone(),
            StepRegistry::with_default_steps(),
            Arc::new(factory),
        ))
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn manifest(&self) -> proto::CogManifest {
        proto::CogManifest {
            name: self.identity.name.clone(),
            label: self.identity.label.clone(),
            version: self.identity.version.clone(),
            homepage: self.identity.homepage.clone(),
            step_definitions: self.registry.descriptors().iter().map(Into::into).collect(),
            auth_fields: expected_auth_fields().iter().map(Into::into).collect(),
            auth_help_url: self.identity.auth_help_url.clone(),
        }
    }

    /// Run a single step in its own call-scope.
    pub async fn dispatch_one(
        &self,
        metadata: MetadataMap,
        invocation: StepInvocation,
    ) -> StepOutcome {
        CallScope::new(self.clone(), metadata)
            .dispatch(invocation)
            .await
    }

    /// Run a stream of steps in one call-scope. Outcomes come back in request order;
    /// processing stops when the inbound stream ends or errors, or the reader goes away.
    pub fn dispatch_stream<S>(&self, metadata: MetadataMap, mut requests: S) -> ResponseStream
    where
        S: Stream<Item = std::result::Result<proto::RunStepRequest, Status>>
            + Send
            + Unpin
            + 'static,
    {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let mut scope = CallScope::new(self.clone(), metadata);

        tokio::spawn(async move {
            while let Some(request) = requests.next().await {
                let request = match request {
                    Ok(request) => request,
                    Err(status) => {
                        debug!(code = ?status.code(), "RunSteps inbound stream ended with error");
                        break;
                    }
                };

                let outcome = scope.dispatch(StepInvocation::from(request)).await;
                if tx.send(Ok(outcome.into())).await.is_err() {
                    debug!("RunSteps receiver dropped, stopping");
                    break;
                }
            }
            debug!(steps = scope.dispatched, "RunSteps call-scope finished");
        });

        ReceiverStream::new(rx)
    }

    async fn execute(
        &self,
        invocation: &StepInvocation,
        client: Arc<dyn RegistrantAware>,
    ) -> StepOutcome {
        // Factories run under the same guard as the handler itself.
        let guarded = async {
            let Some(step) = self.registry.resolve(&invocation.step_id, client) else {
                return unknown_step(&invocation.step_id);
            };
            step.execute_step(invocation).await
        };

        match AssertUnwindSafe(guarded).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log_error(
                    "dispatcher",
                    "execute_step",
                    &message,
                    Some(invocation.step_id.as_str()),
                );
                StepOutcome::error(
                    "Error running step %s: %s",
                    vec![json!(invocation.step_id), json!(message)],
                )
            }
        }
    }
}

fn unknown_step(step_id: &str) -> StepOutcome {
    StepOutcome::error("Unknown step %s", vec![json!(step_id)])
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

enum ClientState {
    Pending,
    Ready(Arc<dyn RegistrantAware>),
    Failed(String),
}

/// One RPC's worth of state: its metadata and its lazily built client.
pub struct CallScope {
    cog: Cog,
    metadata: MetadataMap,
    client: ClientState,
    dispatched: usize,
}

impl CallScope {
    pub fn new(cog: Cog, metadata: MetadataMap) -> Self {
        Self {
            cog,
            metadata,
            client: ClientState::Pending,
            dispatched: 0,
        }
    }

    fn client(&mut self) -> std::result::Result<Arc<dyn RegistrantAware>, String> {
        if matches!(self.client, ClientState::Pending) {
            self.client = match self.cog.client_factory.create_client(&self.metadata) {
                Ok(client) => ClientState::Ready(client),
                Err(e) => {
                    warn!(error = %e, "Client construction failed for call-scope");
                    ClientState::Failed(e.to_string())
                }
            };
        }

        match &self.client {
            ClientState::Ready(client) => Ok(client.clone()),
            ClientState::Failed(message) => Err(message.clone()),
            ClientState::Pending => Err("client was not constructed".to_string()),
        }
    }

    #[instrument(skip_all, fields(step_id = %invocation.step_id, request_id = %invocation.request_id))]
    pub async fn dispatch(&mut self, invocation: StepInvocation) -> StepOutcome {
        let started = Instant::now();
        self.dispatched += 1;

        let client = self.client();
        let outcome = if !self.cog.registry.contains(&invocation.step_id) {
            unknown_step(&invocation.step_id)
        } else {
            match client {
                Ok(client) => self.cog.execute(&invocation, client).await,
                Err(message) => StepOutcome::error(
                    "There was a problem authenticating: %s",
                    vec![json!(message)],
                ),
            }
        };

        log_step_operation(
            &invocation.step_id,
            &invocation.request_id,
            &outcome.outcome.to_string(),
            started.elapsed().as_millis() as u64,
            (!outcome.is_passed())
                .then(|| outcome.rendered_message())
                .as_deref(),
        );
        outcome
    }
}

#[tonic::async_trait]
impl CogService for Cog {
    type RunStepsStream = ResponseStream;

    async fn get_manifest(
        &self,
        _request: Request<proto::ManifestRequest>,
    ) -> std::result::Result<Response<proto::CogManifest>, Status> {
        Ok(Response::new(self.manifest()))
    }

    async fn run_step(
        &self,
        request: Request<proto::RunStepRequest>,
    ) -> std::result::Result<Response<proto::RunStepResponse>, Status> {
        let (metadata, _extensions, message) = request.into_parts();
        let outcome = self.dispatch_one(metadata, message.into()).await;
        Ok(Response::new(outcome.into()))
    }

    async fn run_steps(
        &self,
        request: Request<Streaming<proto::RunStepRequest>>,
    ) -> std::result::Result<Response<Self::RunStepsStream>, Status> {
        let (metadata, _extensions, requests) = request.into_parts();
        Ok(Response::new(self.dispatch_stream(metadata, requests)))
    }
}

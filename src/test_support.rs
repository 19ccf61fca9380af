//! In-memory doubles for unit tests: a scripted registrant client and a factory that
//! counts how often a call-scope authenticates.

use crate::client::{ClientError, ClientFactory, ForgetResult, Registrant, RegistrantAware};
use crate::error::{CogError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tonic::metadata::MetadataMap;

type Scripted<T> = Mutex<VecDeque<std::result::Result<T, String>>>;

/// Scripted client: each call pops the next queued response. An empty lookup queue
/// answers "no registrants".
#[derive(Debug, Default)]
pub struct MockRegistrantClient {
    lookups: Scripted<Vec<Registrant>>,
    creates: Scripted<Registrant>,
    forgets: Scripted<ForgetResult>,
    pub created: Mutex<Vec<(u64, Registrant)>>,
    pub lookup_calls: Mutex<Vec<(u64, String)>>,
}

impl MockRegistrantClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup(self, registrants: Vec<Value>) -> Self {
        let registrants = registrants.into_iter().map(into_map).collect();
        push(&self.lookups, Ok(registrants));
        self
    }

    pub fn with_lookup_error(self, message: &str) -> Self {
        push(&self.lookups, Err(message.to_string()));
        self
    }

    pub fn with_create(self, registrant: Value) -> Self {
        push(&self.creates, Ok(into_map(registrant)));
        self
    }

    pub fn with_create_error(self, message: &str) -> Self {
        push(&self.creates, Err(message.to_string()));
        self
    }

    pub fn with_forget(self, event_user_ids: Vec<Value>) -> Self {
        push(&self.forgets, Ok(ForgetResult { event_user_ids }));
        self
    }

    pub fn with_forget_error(self, message: &str) -> Self {
        push(&self.forgets, Err(message.to_string()));
        self
    }
}

fn push<T>(queue: &Scripted<T>, item: std::result::Result<T, String>) {
    queue.lock().unwrap().push_back(item);
}

fn pop<T>(queue: &Scripted<T>, empty: impl FnOnce() -> T) -> std::result::Result<T, ClientError> {
    match queue.lock().unwrap().pop_front() {
        Some(Ok(value)) => Ok(value),
        Some(Err(message)) => Err(ClientError::Api {
            status: 500,
            message,
        }),
        None => Ok(empty()),
    }
}

fn into_map(value: Value) -> Registrant {
    match value {
        Value::Object(map) => map,
        other => panic!("registrant fixtures must be objects, got {other}"),
    }
}

#[async_trait]
impl RegistrantAware for MockRegistrantClient {
    async fn get_event_registrant_by_email(
        &self,
        event_id: u64,
        email: &str,
    ) -> std::result::Result<Vec<Registrant>, ClientError> {
        self.lookup_calls
            .lock()
            .unwrap()
            .push((event_id, email.to_string()));
        pop(&self.lookups, Vec::new)
    }

    async fn create_event_registrant(
        &self,
        event_id: u64,
        registrant: &Registrant,
    ) -> std::result::Result<Registrant, ClientError> {
        self.created
            .lock()
            .unwrap()
            .push((event_id, registrant.clone()));
        pop(&self.creates, || registrant.clone())
    }

    async fn forget_event_registrant_by_email(
        &self,
        _event_id: u64,
        _email: &str,
    ) -> std::result::Result<ForgetResult, ClientError> {
        pop(&self.forgets, ForgetResult::default)
    }
}

/// Hands out the same mock client and counts constructions.
#[derive(Debug, Default)]
pub struct CountingClientFactory {
    client: Arc<MockRegistrantClient>,
    fail_with: Option<String>,
    pub constructions: AtomicUsize,
}

impl CountingClientFactory {
    pub fn new(client: MockRegistrantClient) -> Self {
        Self {
            client: Arc::new(client),
            fail_with: None,
            constructions: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }
}

impl ClientFactory for CountingClientFactory {
    fn create_client(&self, _metadata: &MetadataMap) -> Result<Arc<dyn RegistrantAware>> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(CogError::AuthenticationError(message.clone())),
            None => Ok(self.client.clone()),
        }
    }
}

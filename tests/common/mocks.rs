//! In-memory stand-in for the ON24 registrant API.
//!
//! Behaves like a tiny registrant store so multi-step scenarios (create, then check,
//! then forget) can run end to end without the network.

use async_trait::async_trait;
use chrono::Utc;
use on24_cog::client::{
    AuthCredentials, ClientError, ClientFactory, ForgetResult, Registrant, RegistrantAware,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tonic::metadata::MetadataMap;

#[derive(Debug, Default)]
pub struct InMemoryRegistrants {
    registrants: Mutex<BTreeMap<(u64, String), Registrant>>,
    next_id: AtomicU64,
}

impl InMemoryRegistrants {
    pub fn new() -> Self {
        Self {
            registrants: Mutex::default(),
            next_id: AtomicU64::new(1000),
        }
    }

    /// Seed a registrant directly, bypassing validation.
    pub fn seed(&self, event_id: u64, registrant: Value) {
        let registrant = match registrant {
            Value::Object(map) => map,
            other => panic!("registrant must be an object, got {other}"),
        };
        let email = registrant
            .get("email")
            .and_then(Value::as_str)
            .expect("seeded registrant has an email")
            .to_string();
        self.registrants
            .lock()
            .unwrap()
            .insert((event_id, email), registrant);
    }

    pub fn count(&self) -> usize {
        self.registrants.lock().unwrap().len()
    }
}

#[async_trait]
impl RegistrantAware for InMemoryRegistrants {
    async fn get_event_registrant_by_email(
        &self,
        event_id: u64,
        email: &str,
    ) -> Result<Vec<Registrant>, ClientError> {
        Ok(self
            .registrants
            .lock()
            .unwrap()
            .get(&(event_id, email.to_string()))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn create_event_registrant(
        &self,
        event_id: u64,
        registrant: &Registrant,
    ) -> Result<Registrant, ClientError> {
        let Some(email) = registrant.get("email").and_then(Value::as_str) else {
            return Err(ClientError::Api {
                status: 400,
                message: "email is required".to_string(),
            });
        };

        let mut stored = registrant.clone();
        stored.insert(
            "eventuserid".to_string(),
            json!(self.next_id.fetch_add(1, Ordering::SeqCst)),
        );
        stored.insert("createtimestamp".to_string(), json!(Utc::now().to_rfc3339()));
        stored.insert("eventid".to_string(), json!(event_id));

        self.registrants
            .lock()
            .unwrap()
            .insert((event_id, email.to_string()), stored.clone());
        Ok(stored)
    }

    async fn forget_event_registrant_by_email(
        &self,
        event_id: u64,
        email: &str,
    ) -> Result<ForgetResult, ClientError> {
        let removed = self
            .registrants
            .lock()
            .unwrap()
            .remove(&(event_id, email.to_string()));

        match removed {
            Some(registrant) => Ok(ForgetResult {
                event_user_ids: registrant.get("eventuserid").cloned().into_iter().collect(),
            }),
            None => Err(ClientError::Api {
                status: 404,
                message: format!("Registrant {email} not found"),
            }),
        }
    }
}

/// Validates credentials the way production does, then hands out the shared store.
#[derive(Debug)]
pub struct InMemoryClientFactory {
    pub store: Arc<InMemoryRegistrants>,
    constructions: AtomicUsize,
}

impl InMemoryClientFactory {
    pub fn new(store: Arc<InMemoryRegistrants>) -> Self {
        Self {
            store,
            constructions: AtomicUsize::new(0),
        }
    }

    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }
}

impl ClientFactory for InMemoryClientFactory {
    fn create_client(&self, metadata: &MetadataMap) -> on24_cog::Result<Arc<dyn RegistrantAware>> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        AuthCredentials::from_metadata(metadata)?;
        Ok(self.store.clone())
    }
}

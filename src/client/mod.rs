//! # Client Facade
//!
//! Step handlers never see the ON24 HTTP client directly. They talk to the narrow
//! [`RegistrantAware`] capability interface, implemented by [`ClientWrapper`].
//!
//! ## Lifecycle
//!
//! A [`ClientFactory`] builds one facade per call-scope from the credentials in that
//! call's metadata. Building performs no network I/O; a malformed credential fails
//! immediately with [`CogError::AuthenticationError`].

pub mod credentials;
pub mod on24;

pub use credentials::{expected_auth_fields, AuthCredentials};
pub use on24::{On24Client, DEFAULT_BASE_URL};

use crate::error::{CogError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tonic::metadata::MetadataMap;
use url::Url;

/// A registrant as returned by ON24: an open-ended field map.
pub type Registrant = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("ON24 API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected ON24 response: {0}")]
    Decode(String),
    #[error("Invalid ON24 base URL: {0}")]
    InvalidUrl(String),
}

/// What the forget call reports back: only identifiers, never the full registrant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForgetResult {
    pub event_user_ids: Vec<Value>,
}

/// Registrant capabilities the step handlers rely on.
#[async_trait]
pub trait RegistrantAware: Send + Sync {
    async fn get_event_registrant_by_email(
        &self,
        event_id: u64,
        email: &str,
    ) -> std::result::Result<Vec<Registrant>, ClientError>;

    async fn create_event_registrant(
        &self,
        event_id: u64,
        registrant: &Registrant,
    ) -> std::result::Result<Registrant, ClientError>;

    async fn forget_event_registrant_by_email(
        &self,
        event_id: u64,
        email: &str,
    ) -> std::result::Result<ForgetResult, ClientError>;
}

/// Facade over the ON24 client, authenticated once per call-scope.
#[derive(Debug, Clone)]
pub struct ClientWrapper {
    client: On24Client,
}

impl ClientWrapper {
    pub fn new(client: On24Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RegistrantAware for ClientWrapper {
    async fn get_event_registrant_by_email(
        &self,
        event_id: u64,
        email: &str,
    ) -> std::result::Result<Vec<Registrant>, ClientError> {
        let response = self.client.list_event_registrants(event_id, email).await?;
        Ok(response.registrants)
    }

    async fn create_event_registrant(
        &self,
        event_id: u64,
        registrant: &Registrant,
    ) -> std::result::Result<Registrant, ClientError> {
        self.client.create_registrant(event_id, registrant).await
    }

    async fn forget_event_registrant_by_email(
        &self,
        event_id: u64,
        email: &str,
    ) -> std::result::Result<ForgetResult, ClientError> {
        let response = self.client.forget_registrant(email, event_id).await?;
        Ok(ForgetResult {
            event_user_ids: response.deletedregistrants.eventuserids,
        })
    }
}

/// Builds the per-call-scope facade from call metadata.
pub trait ClientFactory: Send + Sync + fmt::Debug {
    fn create_client(&self, metadata: &MetadataMap) -> Result<Arc<dyn RegistrantAware>>;
}

/// Production factory: one shared HTTP connection pool, fresh credentials per scope.
#[derive(Debug, Clone)]
pub struct On24ClientFactory {
    http: reqwest::Client,
    base_url: Url,
}

impl On24ClientFactory {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CogError::ConfigurationError(format!("Invalid ON24 base URL '{base_url}': {e}"))
        })?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("on24-cog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CogError::ConfigurationError(format!("HTTP client setup failed: {e}")))?;

        Ok(Self { http, base_url })
    }
}

impl ClientFactory for On24ClientFactory {
    fn create_client(&self, metadata: &MetadataMap) -> Result<Arc<dyn RegistrantAware>> {
        let credentials = AuthCredentials::from_metadata(metadata)?;
        let client = On24Client::new(self.http.clone(), self.base_url.clone(), credentials);
        Ok(Arc::new(ClientWrapper::new(client)))
    }
}

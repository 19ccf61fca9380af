//! Thin ON24 REST v2 client.
//!
//! Only the three registrant calls the Cog needs. Authentication rides along on every
//! request as `accessTokenKey` / `accessTokenSecret` headers; constructing the client
//! performs no I/O. No retries and no client-side timeout: the host owns both.

use super::credentials::AuthCredentials;
use super::{ClientError, Registrant};
use crate::operators::display_value;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.on24.com";

const ACCESS_TOKEN_KEY_HEADER: &str = "accessTokenKey";
const ACCESS_TOKEN_SECRET_HEADER: &str = "accessTokenSecret";

#[derive(Debug, Deserialize)]
pub struct RegistrantListResponse {
    #[serde(default)]
    pub registrants: Vec<Registrant>,
}

#[derive(Debug, Deserialize)]
pub struct ForgetRegistrantResponse {
    pub deletedregistrants: DeletedRegistrants,
}

#[derive(Debug, Deserialize)]
pub struct DeletedRegistrants {
    #[serde(default)]
    pub eventuserids: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct On24Client {
    http: reqwest::Client,
    base_url: Url,
    credentials: AuthCredentials,
}

impl On24Client {
    pub fn new(http: reqwest::Client, base_url: Url, credentials: AuthCredentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    /// `GET /v2/client/{clientId}/event/{eventId}/registrant?email=...`
    pub async fn list_event_registrants(
        &self,
        event_id: u64,
        email: &str,
    ) -> Result<RegistrantListResponse, ClientError> {
        let url = self.endpoint(&["event", &event_id.to_string(), "registrant"])?;
        debug!(event_id, "Listing ON24 event registrants");

        let response = self
            .authorized(self.http.get(url))
            .query(&[("email", email)])
            .send()
            .await?;

        Self::decode(response).await
    }

    /// `POST /v2/client/{clientId}/event/{eventId}/registrant` with form-encoded fields.
    pub async fn create_registrant(
        &self,
        event_id: u64,
        registrant: &Registrant,
    ) -> Result<Registrant, ClientError> {
        let url = self.endpoint(&["event", &event_id.to_string(), "registrant"])?;
        let form: Vec<(String, String)> = registrant
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), display_value(value)))
            .collect();
        debug!(event_id, field_count = form.len(), "Creating ON24 registrant");

        let response = self
            .authorized(self.http.post(url))
            .form(&form)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// `DELETE /v2/client/{clientId}/registrant/{email}?eventid=...`
    pub async fn forget_registrant(
        &self,
        email: &str,
        event_id: u64,
    ) -> Result<ForgetRegistrantResponse, ClientError> {
        let url = self.endpoint(&["registrant", email])?;
        debug!(event_id, "Forgetting ON24 registrant");

        let response = self
            .authorized(self.http.delete(url))
            .query(&[("eventid", event_id)])
            .send()
            .await?;

        Self::decode(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let client_id = self.credentials.client_id.to_string();
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v2", "client", client_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(ACCESS_TOKEN_KEY_HEADER, &self.credentials.token_key)
            .header(ACCESS_TOKEN_SECRET_HEADER, &self.credentials.token_secret)
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn api_error(status: StatusCode, body: String) -> ClientError {
    // ON24 error bodies look like {"code": 1, "message": "..."}.
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

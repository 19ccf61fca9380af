//! Per-call credentials supplied by the host in gRPC metadata.

use crate::error::{CogError, Result};
use crate::step::{FieldSpec, FieldType};
use std::fmt;
use tonic::metadata::MetadataMap;

pub const CLIENT_ID_FIELD: &str = "clientId";
pub const TOKEN_KEY_FIELD: &str = "tokenKey";
pub const TOKEN_SECRET_FIELD: &str = "tokenSecret";

/// Auth fields declared in the manifest. The host collects these from the user and
/// replays them as metadata on every call.
pub fn expected_auth_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required(CLIENT_ID_FIELD, FieldType::Numeric, "Client ID").with_help(
            "This is the numeric Client ID, found on your API Dashboard when creating the token.",
        ),
        FieldSpec::required(TOKEN_KEY_FIELD, FieldType::String, "Token Key")
            .with_help("This alphanumeric string can be found on the API Dashboard."),
        FieldSpec::required(TOKEN_SECRET_FIELD, FieldType::String, "Token Secret")
            .with_help("This alphanumeric string can be found on the API Dashboard."),
    ]
}

#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredentials {
    pub client_id: u64,
    pub token_key: String,
    pub token_secret: String,
}

// Secrets stay out of logs.
impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("client_id", &self.client_id)
            .field("token_key", &"[REDACTED]")
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

impl AuthCredentials {
    /// Extract all three credentials. Every field is required; there are no defaults.
    pub fn from_metadata(metadata: &MetadataMap) -> Result<Self> {
        let client_id = metadata_value(metadata, CLIENT_ID_FIELD)?;
        let client_id = client_id.trim().parse::<u64>().map_err(|_| {
            CogError::AuthenticationError(format!(
                "Auth field '{CLIENT_ID_FIELD}' must be numeric"
            ))
        })?;

        Ok(Self {
            client_id,
            token_key: metadata_value(metadata, TOKEN_KEY_FIELD)?,
            token_secret: metadata_value(metadata, TOKEN_SECRET_FIELD)?,
        })
    }
}

// gRPC metadata keys travel lower-cased over HTTP/2.
fn metadata_value(metadata: &MetadataMap, field: &str) -> Result<String> {
    let key = field.to_ascii_lowercase();
    let value = metadata
        .get(key.as_str())
        .ok_or_else(|| {
            CogError::AuthenticationError(format!("Missing required auth field '{field}'"))
        })?
        .to_str()
        .map_err(|_| {
            CogError::AuthenticationError(format!("Auth field '{field}' is not valid ASCII"))
        })?;

    if value.is_empty() {
        return Err(CogError::AuthenticationError(format!(
            "Missing required auth field '{field}'"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&'static str, &str)]) -> MetadataMap {
        let mut map = MetadataMap::new();
        for (key, value) in pairs {
            map.insert(*key, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_credentials_from_metadata() {
        let creds = AuthCredentials::from_metadata(&metadata(&[
            ("clientid", "123"),
            ("tokenkey", "some-token-key"),
            ("tokensecret", "some-token-secret"),
        ]))
        .unwrap();

        assert_eq!(creds.client_id, 123);
        assert_eq!(creds.token_key, "some-token-key");
        assert_eq!(creds.token_secret, "some-token-secret");
        assert!(!format!("{creds:?}").contains("some-token-secret"));
    }

    #[test]
    fn test_non_numeric_client_id_rejected() {
        let err = AuthCredentials::from_metadata(&metadata(&[
            ("clientid", "abc"),
            ("tokenkey", "k"),
            ("tokensecret", "s"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CogError::AuthenticationError(msg) if msg.contains("numeric")));
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = AuthCredentials::from_metadata(&metadata(&[("clientid", "1"), ("tokenkey", "k")]))
            .unwrap_err();
        assert_eq!(
            err,
            CogError::AuthenticationError("Missing required auth field 'tokenSecret'".to_string())
        );
    }

    #[test]
    fn test_auth_field_declarations() {
        let fields = expected_auth_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].key, "clientId");
        assert_eq!(fields[0].field_type, FieldType::Numeric);
        assert!(fields.iter().all(|f| f.help.is_some()));
    }
}

//! Access tokens from the hosting environment.
//!
//! [`CredentialProvider`] is the capability the vault client needs: "give me a
//! token for this resource". [`DefaultCredential`] chains the environment
//! service principal and the platform managed identity, in that order, which is
//! what an App Service deployment expects.

mod chain;
mod client_secret;
mod managed_identity;

pub use chain::DefaultCredential;
pub use client_secret::ClientSecretCredential;
pub use managed_identity::{ManagedIdentityCredential, ManagedIdentitySource};

use crate::error::CredentialError;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Resource identifier for Azure Key Vault data-plane tokens.
pub const KEY_VAULT_RESOURCE: &str = "https://vault.azure.net";

/// Environment lookup used by the `from_env_with` constructors.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Reads the real process environment, treating blank values as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: Option<Duration>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Produces a bearer token usable for calls against `resource`.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    async fn acquire(&self, resource: &str) -> Result<AccessToken, CredentialError>;
}

/// A fixed token, for emulators and tests.
pub struct StaticToken(pub String);

#[async_trait::async_trait]
impl CredentialProvider for StaticToken {
    fn name(&self) -> &'static str {
        "StaticToken"
    }

    async fn acquire(&self, _resource: &str) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken {
            token: self.0.clone(),
            expires_in: None,
        })
    }
}

/// Token endpoints report lifetimes as either JSON numbers or numeric strings.
fn json_seconds(value: Option<&serde_json::Value>) -> Option<u64> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Lifetime from `expires_in`, or from the absolute `expires_on` epoch.
fn token_lifetime(body: &serde_json::Value) -> Option<Duration> {
    if let Some(secs) = json_seconds(body.get("expires_in")) {
        return Some(Duration::from_secs(secs));
    }
    let expires_on = json_seconds(body.get("expires_on"))?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(Duration::from_secs(expires_on.saturating_sub(now)))
}

/// Pulls `access_token` out of a token endpoint response body.
fn parse_token_response(
    credential: &'static str,
    body: &[u8],
) -> Result<AccessToken, CredentialError> {
    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| CredentialError::Parse {
            credential,
            reason: e.to_string(),
        })?;

    let token = json
        .get("access_token")
        .and_then(|v| v.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CredentialError::Parse {
            credential,
            reason: "missing access_token".to_string(),
        })?;

    Ok(AccessToken {
        token: token.to_string(),
        expires_in: token_lifetime(&json),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_response_with_string_expiry() {
        let body = br#"{"access_token":"tok","expires_in":"3599","token_type":"Bearer"}"#;
        let token = parse_token_response("test", body).unwrap();
        assert_eq!(token.token, "tok");
        assert_eq!(token.expires_in, Some(Duration::from_secs(3599)));
    }

    #[test]
    fn test_parse_token_response_with_numeric_expiry() {
        let body = br#"{"access_token":"tok","expires_in":60}"#;
        let token = parse_token_response("test", body).unwrap();
        assert_eq!(token.expires_in, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_token_response_missing_token() {
        let err = parse_token_response("test", br#"{"token_type":"Bearer"}"#).unwrap_err();
        assert!(err.to_string().contains("missing access_token"));
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken {
            token: "super-secret".to_string(),
            expires_in: None,
        };
        assert!(!format!("{token:?}").contains("super-secret"));
    }
}

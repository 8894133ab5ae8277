use std::sync::Arc;

use reqwest::{Method, Request, Url};
use serde::Deserialize;
use tracing::debug;

use super::SECRETS_API_VERSION;
use crate::error::SecretFetchError;
use crate::fetch::auth::Bearer;
use crate::fetch::{HttpClient, fetch};
use crate::infra::identity::{CredentialProvider, KEY_VAULT_RESOURCE};
use crate::services::secret_store::{Secret, SecretReference, SecretStore};

#[derive(Deserialize)]
struct SecretBundle {
    value: Option<String>,
    id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Reads secrets from Azure Key Vault.
///
/// Each lookup acquires a fresh token from the credential; there is no token
/// or value cache.
pub struct KeyVaultClient {
    http: Arc<dyn HttpClient>,
    credential: Arc<dyn CredentialProvider>,
    resource: String,
}

impl KeyVaultClient {
    pub fn new(http: Arc<dyn HttpClient>, credential: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http,
            credential,
            resource: KEY_VAULT_RESOURCE.to_string(),
        }
    }

    /// Overrides the token resource (sovereign clouds).
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    fn secret_url(reference: &SecretReference) -> Result<Url, SecretFetchError> {
        reference.validate()?;

        let base = Url::parse(reference.vault_uri()).map_err(|e| {
            SecretFetchError::InvalidReference(format!(
                "invalid vault URI '{}': {e}",
                reference.vault_uri()
            ))
        })?;
        let mut url = base
            .join(&format!("secrets/{}", reference.secret_name()))
            .map_err(|e| SecretFetchError::InvalidReference(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("api-version", SECRETS_API_VERSION);
        Ok(url)
    }
}

/// Splits `https://{vault}/secrets/{name}/{version}` into name and version.
fn parse_secret_id(id: &str) -> Option<(String, Option<String>)> {
    let url = Url::parse(id).ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    if segments.next()? != "secrets" {
        return None;
    }
    let name = segments.next()?.to_string();
    let version = segments.next().map(str::to_string);
    Some((name, version))
}

fn service_error(status: reqwest::StatusCode, body: &[u8]) -> SecretFetchError {
    let (code, message) = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, None),
    };
    SecretFetchError::Service {
        status,
        code: code.unwrap_or_else(|| "Unknown".to_string()),
        message: message.unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
    }
}

#[async_trait::async_trait]
impl SecretStore for KeyVaultClient {
    async fn get_secret(&self, reference: &SecretReference) -> Result<Secret, SecretFetchError> {
        let url = Self::secret_url(reference)?;

        let token = self.credential.acquire(&self.resource).await?;
        debug!(
            credential = self.credential.name(),
            expires_in = ?token.expires_in,
            "Vault token acquired"
        );

        let client = Bearer::new(self.http.as_ref(), &token.token).map_err(|e| {
            SecretFetchError::InvalidResponse(format!("credential produced an unusable token: {e}"))
        })?;
        let resp = fetch(&client, Request::new(Method::GET, url)).await?;

        if !resp.status.is_success() {
            return Err(service_error(resp.status, &resp.body));
        }

        let bundle: SecretBundle = serde_json::from_slice(&resp.body)
            .map_err(|e| SecretFetchError::InvalidResponse(e.to_string()))?;

        let value = bundle
            .value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SecretFetchError::InvalidResponse(format!(
                    "secret '{}' has no value",
                    reference.secret_name()
                ))
            })?;

        let (name, version) = bundle
            .id
            .as_deref()
            .and_then(parse_secret_id)
            .unwrap_or_else(|| (reference.secret_name().to_string(), None));

        Ok(Secret {
            name,
            value,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialError;
    use crate::fetch::testing::RecordingClient;
    use crate::infra::identity::{
        AccessToken, ManagedIdentityCredential, ManagedIdentitySource, StaticToken,
    };

    fn reference() -> SecretReference {
        SecretReference::for_vault("kv-lewis", "DbConnectionString")
    }

    fn client_with(responses: Vec<(u16, String)>) -> (Arc<RecordingClient>, KeyVaultClient) {
        let http = Arc::new(RecordingClient::new(responses));
        let kv = KeyVaultClient::new(http.clone(), Arc::new(StaticToken("kv-token".to_string())));
        (http, kv)
    }

    #[test]
    fn test_secret_url() {
        let url = KeyVaultClient::secret_url(&reference()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://kv-lewis.vault.azure.net/secrets/DbConnectionString?api-version=7.4"
        );
    }

    #[test]
    fn test_secret_url_keeps_vault_path_prefix() {
        let r = SecretReference::with_vault_uri("http://127.0.0.1:9000/vault", "x");
        let url = KeyVaultClient::secret_url(&r).unwrap();
        assert_eq!(url.path(), "/vault/secrets/x");
    }

    #[test]
    fn test_parse_secret_id() {
        assert_eq!(
            parse_secret_id("https://kv-lewis.vault.azure.net/secrets/DbConnectionString/abc123"),
            Some(("DbConnectionString".to_string(), Some("abc123".to_string())))
        );
        assert_eq!(
            parse_secret_id("https://kv-lewis.vault.azure.net/secrets/Other"),
            Some(("Other".to_string(), None))
        );
        assert_eq!(parse_secret_id("https://kv-lewis.vault.azure.net/keys/k/1"), None);
        assert_eq!(parse_secret_id("not a url"), None);
    }

    #[tokio::test]
    async fn test_get_secret_success() {
        let (http, kv) = client_with(vec![(
            200,
            r#"{"value":"Server=x;Database=y;","id":"https://kv-lewis.vault.azure.net/secrets/DbConnectionString/v1","attributes":{"enabled":true}}"#
                .to_string(),
        )]);

        let secret = kv.get_secret(&reference()).await.unwrap();
        assert_eq!(secret.value, "Server=x;Database=y;");
        assert_eq!(secret.name, "DbConnectionString");
        assert_eq!(secret.version.as_deref(), Some("v1"));

        let sent = http.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::GET);
        assert_eq!(sent[0].header("authorization").as_deref(), Some("Bearer kv-token"));
        assert_eq!(sent[0].query("api-version").as_deref(), Some("7.4"));
    }

    #[tokio::test]
    async fn test_get_secret_without_id_uses_requested_name() {
        let (_, kv) = client_with(vec![(200, r#"{"value":"v"}"#.to_string())]);
        let secret = kv.get_secret(&reference()).await.unwrap();
        assert_eq!(secret.name, "DbConnectionString");
        assert_eq!(secret.version, None);
    }

    #[tokio::test]
    async fn test_get_secret_forbidden() {
        let (_, kv) = client_with(vec![(
            403,
            r#"{"error":{"code":"Forbidden","message":"The user, group or application does not have secrets get permission"}}"#
                .to_string(),
        )]);

        let err = kv.get_secret(&reference()).await.unwrap_err();
        match &err {
            SecretFetchError::Service { status, code, .. } => {
                assert_eq!(*status, reqwest::StatusCode::FORBIDDEN);
                assert_eq!(code, "Forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("secrets get permission"));
    }

    #[tokio::test]
    async fn test_get_secret_not_found_with_plain_body() {
        let (_, kv) = client_with(vec![(404, "gone".to_string())]);
        let err = kv.get_secret(&reference()).await.unwrap_err();
        assert!(err.to_string().contains("Unknown"));
        assert!(err.to_string().contains("gone"));
    }

    #[tokio::test]
    async fn test_get_secret_empty_value_is_an_error() {
        let (_, kv) = client_with(vec![(200, r#"{"value":""}"#.to_string())]);
        let err = kv.get_secret(&reference()).await.unwrap_err();
        assert!(matches!(err, SecretFetchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_invalid_name_makes_no_request() {
        let (http, kv) = client_with(vec![]);
        let r = SecretReference::for_vault("kv-lewis", "bad name");
        let err = kv.get_secret(&r).await.unwrap_err();
        assert!(matches!(err, SecretFetchError::InvalidReference(_)));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_resource_override_reaches_token_request() {
        let http = Arc::new(RecordingClient::new(vec![
            (200, r#"{"access_token":"gov-token","expires_in":"3599"}"#.to_string()),
            (200, r#"{"value":"v"}"#.to_string()),
        ]));
        let credential = ManagedIdentityCredential::new(
            http.clone(),
            ManagedIdentitySource::Imds {
                endpoint: "http://169.254.169.254/metadata/identity/oauth2/token".to_string(),
            },
            None,
        );
        let kv = KeyVaultClient::new(http.clone(), Arc::new(credential))
            .with_resource("https://vault.usgovcloudapi.net");
        let r = SecretReference::with_vault_uri("https://kv.vault.usgovcloudapi.net", "x");

        kv.get_secret(&r).await.unwrap();

        let sent = http.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0].query("resource").as_deref(),
            Some("https://vault.usgovcloudapi.net")
        );
        assert_eq!(sent[1].header("authorization").as_deref(), Some("Bearer gov-token"));
        assert_eq!(sent[1].url.host_str(), Some("kv.vault.usgovcloudapi.net"));
    }

    struct Denied;

    #[async_trait::async_trait]
    impl CredentialProvider for Denied {
        fn name(&self) -> &'static str {
            "Denied"
        }

        async fn acquire(&self, _resource: &str) -> Result<AccessToken, CredentialError> {
            Err(CredentialError::Unavailable {
                credential: "Denied",
                reason: "no identity".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_credential_failure_makes_no_vault_request() {
        let http = Arc::new(RecordingClient::new(vec![]));
        let kv = KeyVaultClient::new(http.clone(), Arc::new(Denied));

        let err = kv.get_secret(&reference()).await.unwrap_err();
        assert!(matches!(err, SecretFetchError::Credential(_)));
        assert!(err.to_string().contains("no identity"));
        assert!(http.requests().is_empty());
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};

use super::{AccessToken, CredentialProvider, EnvLookup, parse_token_response};
use crate::error::CredentialError;
use crate::fetch::{HttpClient, fetch};

const NAME: &str = "ClientSecretCredential";
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Service principal credential using the OAuth2 client-credentials flow.
///
/// Configured from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and
/// `AZURE_CLIENT_SECRET`; `AZURE_AUTHORITY_HOST` overrides the login host for
/// sovereign clouds.
pub struct ClientSecretCredential {
    http: Arc<dyn HttpClient>,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    pub fn new(
        http: Arc<dyn HttpClient>,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            tenant_id,
            client_id,
            client_secret,
        }
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    pub fn from_env_with(
        http: Arc<dyn HttpClient>,
        env: EnvLookup<'_>,
    ) -> Result<Self, CredentialError> {
        let missing = |var: &str| CredentialError::Unavailable {
            credential: NAME,
            reason: format!("{var} is not set"),
        };
        let tenant_id = env("AZURE_TENANT_ID").ok_or_else(|| missing("AZURE_TENANT_ID"))?;
        let client_id = env("AZURE_CLIENT_ID").ok_or_else(|| missing("AZURE_CLIENT_ID"))?;
        let client_secret =
            env("AZURE_CLIENT_SECRET").ok_or_else(|| missing("AZURE_CLIENT_SECRET"))?;

        let mut cred = Self::new(http, tenant_id, client_id, client_secret);
        if let Some(host) = env("AZURE_AUTHORITY_HOST") {
            cred = cred.with_authority_host(host);
        }
        Ok(cred)
    }

    fn build_request(&self, resource: &str) -> Result<Request, CredentialError> {
        let endpoint = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        );
        let url = Url::parse(&endpoint).map_err(|e| CredentialError::Unavailable {
            credential: NAME,
            reason: format!("invalid token endpoint '{endpoint}': {e}"),
        })?;

        let scope = format!("{}/.default", resource.trim_end_matches('/'));
        let form = serde_urlencoded::to_string([
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
            ("grant_type", "client_credentials"),
        ])
        .map_err(|e| CredentialError::Unavailable {
            credential: NAME,
            reason: format!("could not encode token request: {e}"),
        })?;

        let mut req = Request::new(Method::POST, url);
        req.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        *req.body_mut() = Some(form.into());
        Ok(req)
    }
}

#[async_trait]
impl CredentialProvider for ClientSecretCredential {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn acquire(&self, resource: &str) -> Result<AccessToken, CredentialError> {
        let req = self.build_request(resource)?;

        let resp = fetch(self.http.as_ref(), req)
            .await
            .map_err(|source| CredentialError::Request {
                credential: NAME,
                source,
            })?;

        if !resp.status.is_success() {
            return Err(CredentialError::Rejected {
                credential: NAME,
                status: resp.status,
                body: resp.text(),
            });
        }

        parse_token_response(NAME, &resp.body)
    }
}

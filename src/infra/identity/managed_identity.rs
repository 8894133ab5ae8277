use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Method, Request, Url};

use super::{AccessToken, CredentialProvider, EnvLookup, parse_token_response};
use crate::error::CredentialError;
use crate::fetch::{HttpClient, fetch};

const NAME: &str = "ManagedIdentityCredential";

const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IMDS_API_VERSION: &str = "2018-02-01";
pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Where the platform exposes its identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedIdentitySource {
    /// App Service / Functions: `IDENTITY_ENDPOINT` guarded by `IDENTITY_HEADER`.
    AppService { endpoint: String, header: String },
    /// Azure Instance Metadata Service, for VMs and scale sets.
    Imds { endpoint: String },
}

impl ManagedIdentitySource {
    /// App Service when both of its variables are set, IMDS otherwise.
    pub fn detect(env: EnvLookup<'_>) -> Self {
        match (env("IDENTITY_ENDPOINT"), env("IDENTITY_HEADER")) {
            (Some(endpoint), Some(header)) => Self::AppService { endpoint, header },
            _ => Self::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        }
    }
}

/// Token from the hosting platform's managed identity.
///
/// `client_id` selects a user-assigned identity; without it the
/// system-assigned identity is used.
pub struct ManagedIdentityCredential {
    http: Arc<dyn HttpClient>,
    source: ManagedIdentitySource,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn new(
        http: Arc<dyn HttpClient>,
        source: ManagedIdentitySource,
        client_id: Option<String>,
    ) -> Self {
        Self {
            http,
            source,
            client_id,
        }
    }

    pub fn from_env_with(http: Arc<dyn HttpClient>, env: EnvLookup<'_>) -> Self {
        Self::new(
            http,
            ManagedIdentitySource::detect(env),
            env("AZURE_CLIENT_ID"),
        )
    }

    fn build_request(&self, resource: &str) -> Result<Request, CredentialError> {
        let (endpoint, api_version) = match &self.source {
            ManagedIdentitySource::AppService { endpoint, .. } => {
                (endpoint.as_str(), APP_SERVICE_API_VERSION)
            }
            ManagedIdentitySource::Imds { endpoint } => (endpoint.as_str(), IMDS_API_VERSION),
        };

        let mut url = Url::parse(endpoint).map_err(|e| CredentialError::Unavailable {
            credential: NAME,
            reason: format!("invalid identity endpoint '{endpoint}': {e}"),
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api-version", api_version);
            query.append_pair("resource", resource);
            if let Some(client_id) = &self.client_id {
                query.append_pair("client_id", client_id);
            }
        }

        let mut req = Request::new(Method::GET, url);
        match &self.source {
            ManagedIdentitySource::AppService { header, .. } => {
                let value = HeaderValue::from_str(header).map_err(|e| {
                    CredentialError::Unavailable {
                        credential: NAME,
                        reason: format!("IDENTITY_HEADER is not a valid header value: {e}"),
                    }
                })?;
                req.headers_mut().insert("x-identity-header", value);
            }
            ManagedIdentitySource::Imds { .. } => {
                req.headers_mut()
                    .insert("metadata", HeaderValue::from_static("true"));
            }
        }
        Ok(req)
    }
}

#[async_trait]
impl CredentialProvider for ManagedIdentityCredential {
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

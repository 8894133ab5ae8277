use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    AccessToken, ClientSecretCredential, CredentialProvider, EnvLookup, ManagedIdentityCredential,
    process_env,
};
use crate::error::CredentialError;
use crate::fetch::HttpClient;

/// Tries each credential in order and returns the first token obtained.
///
/// If every link fails the error carries each link's message, in order.
pub struct DefaultCredential {
    links: Vec<Box<dyn CredentialProvider>>,
}

impl DefaultCredential {
    pub fn new(links: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self { links }
    }

    /// Environment service principal (only when fully configured), then the
    /// platform managed identity.
    pub fn from_env(http: Arc<dyn HttpClient>) -> Self {
        Self::from_env_with(http, &process_env)
    }

    pub fn from_env_with(http: Arc<dyn HttpClient>, env: EnvLookup<'_>) -> Self {
        let mut links: Vec<Box<dyn CredentialProvider>> = Vec::new();
        match ClientSecretCredential::from_env_with(http.clone(), env) {
            Ok(cred) => links.push(Box::new(cred)),
            Err(e) => debug!(reason = %e, "Skipping environment credential"),
        }
        links.push(Box::new(ManagedIdentityCredential::from_env_with(http, env)));
        Self::new(links)
    }

    pub fn link_names(&self) -> Vec<&'static str> {
        self.links.iter().map(|l| l.name()).collect()
    }
}

#[async_trait]
impl CredentialProvider for DefaultCredential {
    fn name(&self) -> &'static str {
        "DefaultCredential"
    }

    async fn acquire(&self, resource: &str) -> Result<AccessToken, CredentialError> {
        let mut failures = Vec::with_capacity(self.links.len());

        for link in &self.links {
            match link.acquire(resource).await {
                Ok(token) => {
                    debug!(credential = link.name(), "Acquired access token");
                    return Ok(token);
                }
                Err(e) => {
                    // The message travels in the aggregated error; the
                    // resolver logs it once.
                    debug!(credential = link.name(), "Credential failed");
                    failures.push(e.to_string());
                }
            }
        }

        Err(CredentialError::Exhausted(failures))
    }
}

//! Azure Key Vault secrets over its REST API.
//!
//! [`KeyVaultClient`] implements [`SecretStore`](crate::services::secret_store::SecretStore)
//! with a single `GET {vault}/secrets/{name}` per lookup, authorised by a
//! bearer token from an injected [`CredentialProvider`](crate::infra::identity::CredentialProvider).

mod client;

pub use client::KeyVaultClient;

/// Key Vault data-plane API version used for secret reads.
pub const SECRETS_API_VERSION: &str = "7.4";

//! One-shot secret resolution with a fail-open fallback.
//!
//! The service must always start: any failure to fetch the secret is logged
//! once and replaced by [`FALLBACK_CONNECTION_STRING`], which callers of
//! `/config` read as a degraded-configuration signal.

use std::fmt;

use tracing::{info, warn};

use crate::services::secret_store::{SecretReference, SecretStore};

/// Value served when the vault could not be read.
pub const FALLBACK_CONNECTION_STRING: &str =
    "CONNECTION STRING: Access Denied or Local Test Failure";

/// Where the resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Vault,
    Fallback,
}

/// The configuration captured once at startup and shared read-only.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub db_connection_string: String,
    pub provenance: Provenance,
    /// The line that was logged when this value was resolved.
    pub diagnostic: String,
}

impl ResolvedConfig {
    pub fn fallback(diagnostic: impl Into<String>) -> Self {
        Self {
            db_connection_string: FALLBACK_CONNECTION_STRING.to_string(),
            provenance: Provenance::Fallback,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("db_connection_string", &"<redacted>")
            .field("provenance", &self.provenance)
            .field("diagnostic", &self.diagnostic)
            .finish()
    }
}

/// Fetches the referenced secret exactly once.
///
/// Never fails. Emits exactly one log line: INFO naming the secret on
/// success, WARN carrying the error otherwise.
pub async fn resolve<S: SecretStore + ?Sized>(
    store: &S,
    reference: &SecretReference,
) -> ResolvedConfig {
    match store.get_secret(reference).await {
        Ok(secret) => {
            info!(
                secret = %secret.name,
                vault = reference.vault_uri(),
                "Successfully retrieved secret"
            );
            ResolvedConfig {
                diagnostic: format!("Successfully retrieved secret: {}", secret.name),
                db_connection_string: secret.value,
                provenance: Provenance::Vault,
            }
        }
        Err(e) => {
            warn!(
                secret = reference.secret_name(),
                vault = reference.vault_uri(),
                error = %e,
                "Error retrieving secret. Falling back to default"
            );
            ResolvedConfig::fallback(format!(
                "Error retrieving secret. Falling back to default: {e}"
            ))
        }
    }
}

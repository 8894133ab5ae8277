//! Error taxonomy for the secret fetch path.
//!
//! Everything here is recovered by the resolver; none of it reaches an HTTP
//! caller.

use reqwest::StatusCode;

/// Failure to obtain an access token for the vault.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The credential source is not configured in this environment.
    #[error("{credential} is unavailable: {reason}")]
    Unavailable {
        credential: &'static str,
        reason: String,
    },
    #[error("{credential} token request failed: {source}")]
    Request {
        credential: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{credential} token endpoint rejected the request: {status} {body}")]
    Rejected {
        credential: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{credential} returned an unreadable token response: {reason}")]
    Parse {
        credential: &'static str,
        reason: String,
    },
    /// Every link of a credential chain failed.
    #[error("no credential in the chain produced a token: {}", .0.join("; "))]
    Exhausted(Vec<String>),
}

/// Failure to fetch the secret value from the vault.
#[derive(Debug, thiserror::Error)]
pub enum SecretFetchError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("invalid secret reference: {0}")]
    InvalidReference(String),
    #[error("vault request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The vault answered with a non-success status.
    #[error("vault returned {status} ({code}): {message}")]
    Service {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("vault returned an unusable response: {0}")]
    InvalidResponse(String),
}

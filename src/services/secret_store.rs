//! Trait and types for fetching a named secret from a vault.

use std::fmt;

use crate::error::SecretFetchError;

/// Where a secret lives: the vault endpoint plus the secret's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    vault_uri: String,
    secret_name: String,
}

impl SecretReference {
    /// Reference into the public-cloud vault called `vault_name`, i.e.
    /// `https://{vault_name}.vault.azure.net/`.
    pub fn for_vault(vault_name: &str, secret_name: impl Into<String>) -> Self {
        Self::with_vault_uri(format!("https://{vault_name}.vault.azure.net/"), secret_name)
    }

    /// Reference into a vault at an explicit URI. A trailing `/` is added if
    /// missing.
    pub fn with_vault_uri(vault_uri: impl Into<String>, secret_name: impl Into<String>) -> Self {
        let mut vault_uri = vault_uri.into();
        if !vault_uri.ends_with('/') {
            vault_uri.push('/');
        }
        Self {
            vault_uri,
            secret_name: secret_name.into(),
        }
    }

    pub fn vault_uri(&self) -> &str {
        &self.vault_uri
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Secret names are 1-127 characters of ASCII letters, digits and `-`.
    pub fn validate(&self) -> Result<(), SecretFetchError> {
        let name = &self.secret_name;
        let valid = !name.is_empty()
            && name.len() <= 127
            && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if valid {
            Ok(())
        } else {
            Err(SecretFetchError::InvalidReference(format!(
                "'{name}' is not a valid secret name"
            )))
        }
    }
}

/// A secret value as returned by the vault.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    pub name: String,
    pub value: String,
    pub version: Option<String>,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("version", &self.version)
            .finish()
    }
}

/// Abstraction over a secret vault (e.g., Azure Key Vault).
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches the current version of the referenced secret in one attempt.
    async fn get_secret(&self, reference: &SecretReference) -> Result<Secret, SecretFetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_vault_derives_uri() {
        let r = SecretReference::for_vault("kv-lewis", "DbConnectionString");
        assert_eq!(r.vault_uri(), "https://kv-lewis.vault.azure.net/");
        assert_eq!(r.secret_name(), "DbConnectionString");
    }

    #[test]
    fn test_with_vault_uri_appends_slash() {
        let r = SecretReference::with_vault_uri("http://127.0.0.1:8200", "x");
        assert_eq!(r.vault_uri(), "http://127.0.0.1:8200/");
    }

    #[test]
    fn test_validate() {
        assert!(SecretReference::for_vault("v", "DbConnectionString").validate().is_ok());
        assert!(SecretReference::for_vault("v", "with-dash-1").validate().is_ok());
        assert!(SecretReference::for_vault("v", "").validate().is_err());
        assert!(SecretReference::for_vault("v", "has/slash").validate().is_err());
        assert!(SecretReference::for_vault("v", "a".repeat(128)).validate().is_err());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let s = Secret {
            name: "n".to_string(),
            value: "Server=x;Password=hunter2".to_string(),
            version: None,
        };
        assert!(!format!("{s:?}").contains("hunter2"));
    }
}

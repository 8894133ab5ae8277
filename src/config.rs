//! Process configuration.
//!
//! Every setting has a default that reproduces the lab deployment, so running
//! the binary with no flags and no environment reads `DbConnectionString`
//! from the `kv-lewis` vault and listens on port 8080.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;

use crate::infra::identity::KEY_VAULT_RESOURCE;
use crate::services::secret_store::SecretReference;

pub const DEFAULT_VAULT_NAME: &str = "kv-lewis";
pub const DEFAULT_SECRET_NAME: &str = "DbConnectionString";

#[derive(Parser, Debug, Clone)]
#[command(name = "keyvault_lab")]
#[command(about = "Serves a connection string read from Azure Key Vault at startup", long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on (App Service sets PORT)
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Key Vault name; the vault URI is https://<name>.vault.azure.net/
    #[arg(long, env = "KEY_VAULT_NAME", default_value = DEFAULT_VAULT_NAME)]
    pub vault_name: String,

    /// Full vault URI, overriding --vault-name
    #[arg(long, env = "KEY_VAULT_URI")]
    pub vault_uri: Option<String>,

    /// Token resource for the vault; set it together with --vault-uri for
    /// sovereign clouds (e.g. https://vault.usgovcloudapi.net)
    #[arg(long, env = "KEY_VAULT_RESOURCE", default_value = KEY_VAULT_RESOURCE)]
    pub vault_resource: String,

    /// Name of the secret to read
    #[arg(long, env = "KEY_VAULT_SECRET_NAME", default_value = DEFAULT_SECRET_NAME)]
    pub secret_name: String,

    /// Do not mount the Swagger UI
    #[arg(long, env = "DISABLE_SWAGGER", default_value_t = false)]
    pub disable_swagger: bool,
}

impl Cli {
    pub fn secret_reference(&self) -> SecretReference {
        match &self.vault_uri {
            Some(uri) => SecretReference::with_vault_uri(uri.clone(), self.secret_name.clone()),
            None => SecretReference::for_vault(&self.vault_name, self.secret_name.clone()),
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind: SocketAddr::new(self.host, self.port),
            swagger_enabled: !self.disable_swagger,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub swagger_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            swagger_enabled: true,
        }
    }
}

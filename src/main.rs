//! Entry point for the Key Vault lab service.
//!
//! Reads one secret from Azure Key Vault using the ambient identity, then
//! serves it on `/config`. The vault read happens once, before the listener
//! is bound; if it fails the service still starts with a placeholder value.

use anyhow::{Context, Result};
use clap::Parser;
use keyvault_lab::{
    config::Cli,
    fetch::{BasicClient, HttpClient},
    infra::identity::{CredentialProvider, DefaultCredential},
    infra::keyvault::KeyVaultClient,
    server::{AppServer, shutdown_signal},
    services::resolver::resolve,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/keyvault_lab.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("keyvault_lab.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("RUST_LOG")
                .from_env_lossy(),
        );

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::DEBUG.into())
                .with_env_var("RUST_LOG_JSON")
                .from_env_lossy(),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let reference = cli.secret_reference();

    let http: Arc<dyn HttpClient> =
        Arc::new(BasicClient::new().context("failed to build HTTP client")?);
    let credential = DefaultCredential::from_env(http.clone());
    info!(
        vault = reference.vault_uri(),
        secret = reference.secret_name(),
        resource = %cli.vault_resource,
        credentials = ?credential.link_names(),
        "Resolving secret"
    );

    let credential: Arc<dyn CredentialProvider> = Arc::new(credential);
    let vault = KeyVaultClient::new(http, credential).with_resource(cli.vault_resource.clone());
    let resolved = resolve(&vault, &reference).await;

    AppServer::new(cli.server_config(), resolved)
        .run_with_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

//! HTTP front: router construction and the server loop.

pub mod handlers;
pub mod openapi;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServerConfig;
use crate::services::resolver::ResolvedConfig;
use openapi::ApiDoc;

/// Build the router over the configuration captured at startup.
///
/// The OpenAPI document is always served at `/api-docs/openapi.json`; the
/// Swagger UI at `/swagger-ui` only when `swagger_enabled`.
pub fn build_router(resolved: Arc<ResolvedConfig>, swagger_enabled: bool) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/config", get(handlers::get_configuration))
        .with_state(resolved);

    if swagger_enabled {
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    } else {
        router = router.route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    router.layer(TraceLayer::new_for_http())
}

/// HTTP server holding the resolved configuration.
///
/// Constructing one requires a [`ResolvedConfig`], so nothing is served before
/// the secret has been resolved.
pub struct AppServer {
    config: ServerConfig,
    resolved: Arc<ResolvedConfig>,
}

impl AppServer {
    pub fn new(config: ServerConfig, resolved: ResolvedConfig) -> Self {
        Self {
            config,
            resolved: Arc::new(resolved),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind
    }

    pub fn router(&self) -> Router {
        build_router(self.resolved.clone(), self.config.swagger_enabled)
    }

    /// Bind the configured address and serve until `shutdown` completes.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.bind).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.router();

        info!(
            bind = %listener.local_addr()?,
            swagger = self.config.swagger_enabled,
            provenance = ?self.resolved.provenance,
            "Starting HTTP server"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server shut down");
        Ok(())
    }
}

/// Completes on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! The two read-only routes.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::resolver::ResolvedConfig;

pub const RUNNING_MESSAGE: &str =
    "Key Vault Lab Application is Running. Access /config for details.";

/// Body of `GET /config`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigResponse {
    /// The secret read at startup, or the fallback placeholder.
    #[serde(rename = "DbConnectionString")]
    pub db_connection_string: String,
}

/// Liveness / info message
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is running", body = String),
    ),
    tag = "Lab"
)]
pub async fn root() -> Json<&'static str> {
    Json(RUNNING_MESSAGE)
}

/// The connection string captured at startup.
///
/// Unauthenticated. A value equal to the fallback placeholder means the vault
/// could not be read when the process started.
#[utoipa::path(
    get,
    path = "/config",
    operation_id = "GetConfiguration",
    responses(
        (status = 200, description = "Resolved configuration", body = ConfigResponse),
    ),
    tag = "Lab"
)]
pub async fn get_configuration(State(config): State<Arc<ResolvedConfig>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        db_connection_string: config.db_connection_string.clone(),
    })
}

use utoipa::OpenApi;

use crate::server::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Key Vault Lab",
        description = "Reads one secret from Azure Key Vault at startup and reports it."
    ),
    paths(handlers::root, handlers::get_configuration),
    components(schemas(handlers::ConfigResponse)),
    tags((name = "Lab", description = "Lab endpoints"))
)]
pub struct ApiDoc;

use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for every outbound call the service makes (identity
/// endpoints and the vault itself).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

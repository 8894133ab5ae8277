use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue, InvalidHeaderValue};

/// An [`HttpClient`] wrapper that sends `Authorization: Bearer <token>` on
/// every request it forwards.
///
/// The header value is validated once in [`Bearer::new`], so forwarding never
/// fails on a malformed token.
pub struct Bearer<'a, C: ?Sized> {
    inner: &'a C,
    header: HeaderValue,
}

impl<'a, C: ?Sized> Bearer<'a, C> {
    pub fn new(inner: &'a C, token: &str) -> Result<Self, InvalidHeaderValue> {
        let mut header = HeaderValue::from_str(&format!("Bearer {token}"))?;
        header.set_sensitive(true);
        Ok(Self { inner, header })
    }
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Bearer<'_, C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(AUTHORIZATION, self.header.clone());
        self.inner.execute(req).await
    }
}

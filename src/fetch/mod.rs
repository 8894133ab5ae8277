mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::StatusCode;

/// A response whose body has been read to completion.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Fetched {
    /// Body as lossy UTF-8, for diagnostics.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends `req` through `client` and reads the whole body.
///
/// Non-success statuses are not errors here; callers decide what a given
/// status means for their protocol.
pub async fn fetch<C: HttpClient + ?Sized>(
    client: &C,
    req: reqwest::Request,
) -> reqwest::Result<Fetched> {
    let resp = client.execute(req).await?;
    let status = resp.status();
    let body = resp.bytes().await?.to_vec();
    Ok(Fetched { status, body })
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingClient;
    use super::*;

    #[tokio::test]
    async fn test_fetch_reads_status_and_body() {
        let client = RecordingClient::new(vec![(404, r#"{"error":"nope"}"#.to_string())]);
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost/x".parse().unwrap(),
        );

        let fetched = fetch(&client, req).await.unwrap();

        assert_eq!(fetched.status, StatusCode::NOT_FOUND);
        assert_eq!(fetched.text(), r#"{"error":"nope"}"#);
    }
}

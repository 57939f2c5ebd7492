mod basic;
mod client;

pub use basic::{BasicClient, REQUEST_TIMEOUT};
pub use client::HttpClient;

use anyhow::{Result, anyhow};
use tracing::debug;

/// GETs `url` and returns the body. A non-success status is an error
/// carrying the status and response body.
#[tracing::instrument(skip(client))]
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("request failed with status {}: {}", status, body));
    }

    let bytes = resp.bytes().await?.to_vec();
    debug!(bytes = bytes.len(), "Response received");
    Ok(bytes)
}

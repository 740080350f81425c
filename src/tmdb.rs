use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

/// Raw upstream reply. The gateway decides what to relay; nothing here
/// interprets the status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Single GET against the upstream catalog. `Err` means the request
    /// never produced an HTTP response (DNS, connect, timeout, body read).
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<UpstreamResponse>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
}

impl TmdbClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let user_agent = format!("cinecatalog/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<UpstreamResponse> {
        // Query carries the credential; keep it out of error messages.
        let res = self
            .client
            .get(url)
            .query(query)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("request failed")?;
        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|e| e.without_url())
            .context("reading body failed")?;
        Ok(UpstreamResponse { status, body })
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{CatalogTransport, FetchError};

/// Talks to a running gateway, e.g. `http://localhost:3000/api/catalog`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpTransport {
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build catalog HTTP client")?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, FetchError> {
        let url = format!("{}/{}", self.base, path);
        let res = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let message = res.json::<ErrorBody>().await.ok().map(|b| b.error);
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        res.json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

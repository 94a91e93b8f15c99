use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::ContentFetcher;

/// Plain HTTP GET against an IPFS gateway (or any JSON URL).
#[derive(Default)]
pub struct GatewayClient {
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl ContentFetcher for GatewayClient {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        debug!(url, "fetching content");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("gateway fetch {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("gateway fetch {url} HTTP {status}: {text}");
        }

        response
            .json()
            .await
            .with_context(|| format!("gateway response from {url} is not JSON"))
    }
}

use bytes::Bytes;
use reqwest::Client;
use tracing::info;

use crate::config::OllamaConfig;
use crate::error::{GatewayError, Result};
use crate::provider::{Provider, ProviderStream, StreamFuture, into_stream};

/// Client for Ollama-style upstreams. The response body is NDJSON: one JSON
/// object per line, with usage counters on the final `done: true` line.
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| {
                GatewayError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    async fn open_stream_impl(url: String, body: Bytes, client: Client) -> Result<ProviderStream> {
        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamNetwork(e.to_string()))?;

        info!(status = %response.status(), "Ollama responded");
        into_stream(response).await
    }
}

impl Provider for OllamaClient {
    fn open_stream(&self, model: &str, body: Bytes) -> StreamFuture {
        let url = format!("{}/api/chat", self.config.endpoint);
        let client = self.client.clone();
        info!(model, bytes = body.len(), "Ollama: opening stream");

        Box::pin(async move { Self::open_stream_impl(url, body, client).await })
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}

use bytes::Bytes;
use reqwest::Client;
use tracing::info;

use crate::config::OpenAiConfig;
use crate::error::{GatewayError, Result};
use crate::provider::{Provider, ProviderStream, StreamFuture, into_stream};

/// Client for OpenAI-compatible upstreams. The response body is an SSE
/// stream of `data: <json>` events terminated by `data: [DONE]`.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| {
                GatewayError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    async fn open_stream_impl(
        url: String,
        api_key: String,
        body: Bytes,
        client: Client,
    ) -> Result<ProviderStream> {
        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .bearer_auth(&api_key)
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamNetwork(e.to_string()))?;

        info!(status = %response.status(), "OpenAI responded");
        into_stream(response).await
    }
}

impl Provider for OpenAiClient {
    fn open_stream(&self, model: &str, body: Bytes) -> StreamFuture {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let api_key = self.config.api_key.clone();
        let client = self.client.clone();
        info!(model, bytes = body.len(), "OpenAI: opening stream");

        Box::pin(async move { Self::open_stream_impl(url, api_key, body, client).await })
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}

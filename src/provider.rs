use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::{GatewayError, Result};

/// Type alias for the raw byte stream of a provider response body
pub type ProviderStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Type alias for the future returned by open_stream
pub type StreamFuture = Pin<Box<dyn Future<Output = Result<ProviderStream>> + Send>>;

/// An upstream inference backend that can stream a chat completion.
///
/// Implementations own transport only: they open the connection, classify a
/// failed status into the error taxonomy, and hand back the raw body stream.
/// Framing of that stream (SSE vs NDJSON) is the orchestrator's concern.
pub trait Provider: Send + Sync {
    /// Open a streaming completion for `model` with the given request body.
    ///
    /// Never yields a stream for a non-2xx response; those become
    /// `RateLimited`, `UpstreamHttp`, or `UpstreamNetwork` errors before any
    /// byte is forwarded.
    fn open_stream(&self, model: &str, body: Bytes) -> StreamFuture;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Turn an upstream response into a body stream, or classify the failure.
pub(crate) async fn into_stream(response: reqwest::Response) -> Result<ProviderStream> {
    let status = response.status();
    if status.is_success() {
        return Ok(Box::pin(response.bytes_stream()));
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::from_status(
        status.as_u16(),
        retry_after.as_deref(),
        body,
    ))
}

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Response, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::ProxyConfig;
use crate::error::{GatewayError, Result};
use crate::metrics::{GatewayMetrics, TracingReporter};
use crate::models::ChatCompletionRequest;
use crate::provider::Provider;
use crate::retry::RetryPolicy;
use crate::streaming::{StreamContext, StreamOrchestrator, StreamReporter};

pub struct AppState {
    pub config: ProxyConfig,
    pub metrics: Arc<GatewayMetrics>,
    reporter: Arc<dyn StreamReporter>,
    retry: RetryPolicy,
    routes: Vec<(String, Arc<dyn Provider>)>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let openai = Arc::new(crate::client::OpenAiClient::new(config.openai.clone())?);
        let ollama = Arc::new(crate::client::OllamaClient::new(config.ollama.clone())?);

        let mut routes: Vec<(String, Arc<dyn Provider>)> = Vec::new();
        for prefix in &config.openai.model_prefixes {
            routes.push((prefix.clone(), openai.clone()));
        }
        for prefix in &config.ollama.model_prefixes {
            routes.push((prefix.clone(), ollama.clone()));
        }

        let retry = RetryPolicy::new(
            config.stream.max_retries,
            Duration::from_millis(config.stream.retry_base_delay_ms),
            Duration::from_millis(config.stream.retry_max_delay_ms),
        );

        let metrics = Arc::new(GatewayMetrics::new());
        let reporter = Arc::new(TracingReporter::new(metrics.clone()));

        Ok(Self {
            config,
            metrics,
            reporter,
            retry,
            routes,
        })
    }

    /// Select the provider serving `model` by name prefix.
    pub fn route(&self, model: &str) -> Result<Arc<dyn Provider>> {
        self.routes
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix.as_str()))
            .map(|(_, provider)| provider.clone())
            .ok_or_else(|| GatewayError::UnknownModel(model.to_string()))
    }
}

pub async fn handle_chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> impl IntoResponse {
    if !request.stream {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Only streaming requests are supported; set \"stream\": true",
            "invalid_request",
        );
    }
    if request.messages.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No messages provided", "invalid_request");
    }

    let provider = match state.route(&request.model) {
        Ok(p) => p,
        Err(e) => {
            error!(model = %request.model, "no provider for model");
            return error_response(StatusCode::NOT_FOUND, &e.to_string(), "model_not_found");
        }
    };

    let body = match request.to_upstream_body() {
        Ok(b) => b,
        Err(e) => {
            error!("Serialization failed: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
                "internal_error",
            );
        }
    };

    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    info!(
        request_id = %request_id,
        provider = provider.name(),
        model = %request.model,
        "opening upstream stream"
    );

    // Bounded backoff around connection establishment only; a stream that has
    // started is never retried.
    let upstream = match state
        .retry
        .open_with_retry(|| provider.open_stream(&request.model, body.clone()))
        .await
    {
        Ok(s) => s,
        Err(e) => {
            error!(request_id = %request_id, "upstream open failed: {}", e);
            let (message, code) = e.error_frame_fields();
            let status = match e {
                GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                GatewayError::UpstreamHttp { status, .. } => {
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            return error_response(status, &message, &code);
        }
    };

    let ctx = StreamContext {
        request_id,
        user_id,
        model: request.model.clone(),
    };
    let orchestrator = StreamOrchestrator::with_buffer_ceiling(
        upstream,
        ctx,
        state.reporter.clone(),
        state.config.stream.buffer_ceiling_bytes,
    );

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .body(Body::from_stream(orchestrator))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn error_response(status: StatusCode, message: &str, code: &str) -> Response<Body> {
    let body = json!({
        "error": {
            "message": message,
            "type": "api_error",
            "code": code,
            "param": null,
        }
    });
    (status, Json(body)).into_response()
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Upstream answered 429; carries the parsed Retry-After hint in seconds.
    #[error("Upstream rate limited (retry-after: {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("Upstream HTTP error {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("Upstream network error: {0}")]
    UpstreamNetwork(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

impl GatewayError {
    /// Classify a failed upstream response into the error taxonomy.
    ///
    /// 429 becomes `RateLimited` with a seconds-valued `Retry-After` hint when
    /// one is present and parseable. Everything else keeps its status and body
    /// so the error frame can carry the provider's own message.
    pub fn from_status(status: u16, retry_after: Option<&str>, body: String) -> Self {
        if status == 429 {
            let retry_after = retry_after.and_then(|v| v.trim().parse::<u64>().ok());
            GatewayError::RateLimited { retry_after }
        } else {
            GatewayError::UpstreamHttp { status, body }
        }
    }

    /// Extract a user-facing (message, code) pair for the canonical error frame.
    ///
    /// Upstream HTTP errors try the provider's own `error.message` /
    /// `error.code` fields first, falling back to the raw body.
    pub fn error_frame_fields(&self) -> (String, String) {
        match self {
            GatewayError::UpstreamHttp { status, body } => {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
                    let message = value
                        .pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(|m| m.to_string());
                    let code = value
                        .pointer("/error/code")
                        .and_then(|c| c.as_str())
                        .map(|c| c.to_string());
                    if let Some(message) = message {
                        return (message, code.unwrap_or_else(|| status.to_string()));
                    }
                }
                (
                    format!("Upstream returned status {}: {}", status, body),
                    status.to_string(),
                )
            }
            GatewayError::UpstreamNetwork(msg) => (
                format!("Upstream network error: {}", msg),
                "network_error".to_string(),
            ),
            GatewayError::RateLimited { .. } => (
                "Upstream rate limit exceeded".to_string(),
                "rate_limited".to_string(),
            ),
            other => (other.to_string(), "internal_error".to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

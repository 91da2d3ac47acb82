use bytes::Bytes;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use super::event::ParsedEvent;
use super::format::StreamFormat;

/// The single output envelope this engine emits downstream.
#[derive(Debug, Serialize)]
pub struct CanonicalChunk {
    pub id: String,
    pub object: &'static str,
    pub created: u64,
    pub model: String,
    pub choices: Vec<CanonicalChoice>,
}

#[derive(Debug, Serialize)]
pub struct CanonicalChoice {
    pub index: u32,
    pub delta: CanonicalDelta,
    pub logprobs: Option<()>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CanonicalDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorFrame<'a> {
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    error_type: &'static str,
    code: &'a str,
    param: Option<()>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Convert one parsed upstream event into canonical output bytes.
///
/// SSE events are already canonically shaped and are re-serialized from the
/// parsed payload (never re-parsed downstream). NDJSON content events are
/// wrapped into a synthetic canonical chunk. Terminal events of either
/// framing produce no bytes here: the orchestrator owns the one terminal
/// sentinel per stream, so a provider-sent `[DONE]` or `done: true` line only
/// marks the end, it is not forwarded.
pub fn to_canonical(event: &ParsedEvent, model: &str, request_id: &str) -> Option<Bytes> {
    let payload = event.payload()?;
    if event.is_terminal() {
        return None;
    }

    match event.format() {
        StreamFormat::ServerSentEvents => {
            let json = serde_json::to_string(payload).ok()?;
            Some(Bytes::from(format!("data: {}\n\n", json)))
        }
        StreamFormat::NewlineDelimitedJson => {
            let content = event.content()?;
            if content.is_empty() {
                return None;
            }
            let chunk = CanonicalChunk {
                id: format!("chatcmpl-{}", request_id),
                object: "chat.completion.chunk",
                created: unix_now(),
                model: model.to_string(),
                choices: vec![CanonicalChoice {
                    index: 0,
                    delta: CanonicalDelta {
                        content: Some(content.to_string()),
                    },
                    logprobs: None,
                    finish_reason: None,
                }],
            };
            let json = serde_json::to_string(&chunk).ok()?;
            Some(Bytes::from(format!("data: {}\n\n", json)))
        }
    }
}

/// The canonical end-of-stream marker for a successful stream.
pub fn sentinel_frame() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

/// A well-formed error frame, emitted instead of the sentinel on a faulted
/// stream.
pub fn error_frame(message: &str, code: &str) -> Bytes {
    let frame = ErrorFrame {
        error: ErrorBody {
            message,
            error_type: "api_error",
            code,
            param: None,
        },
    };
    // Struct serialization cannot fail here
    let json = serde_json::to_string(&frame).unwrap_or_default();
    Bytes::from(format!("data: {}\n\n", json))
}

use serde::Serialize;
use serde_json::Value;

use super::format::StreamFormat;

/// Token usage reported by an upstream, in canonical field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A single upstream event, JSON-parsed exactly once.
///
/// All derived views (`is_terminal`, `content`, `usage`) read the already
/// parsed payload; nothing downstream ever re-parses the raw text. Invalid
/// events (empty input, malformed JSON) are values, not errors: the
/// orchestrator drops them and keeps streaming.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    raw: String,
    format: StreamFormat,
    payload: Option<Value>,
    error: Option<String>,
}

impl ParsedEvent {
    /// Parse one complete, delimiter-stripped event.
    pub fn parse(raw: &str, format: StreamFormat) -> Self {
        match format {
            StreamFormat::ServerSentEvents => Self::parse_sse(raw),
            StreamFormat::NewlineDelimitedJson => Self::parse_ndjson(raw),
        }
    }

    fn parse_sse(raw: &str) -> Self {
        let mut data = None;
        for line in raw.lines() {
            if line.starts_with(':') {
                continue; // SSE comment
            }
            if let Some(rest) = line.strip_prefix("data: ") {
                data = Some(rest);
                break;
            }
        }

        let Some(data) = data else {
            return Self::invalid(raw, StreamFormat::ServerSentEvents, "no data line");
        };

        // The terminal sentinel is not JSON; mark it without a parse attempt.
        if data.trim() == "[DONE]" {
            return Self {
                raw: raw.to_string(),
                format: StreamFormat::ServerSentEvents,
                payload: Some(serde_json::json!({"done": true})),
                error: None,
            };
        }

        match serde_json::from_str::<Value>(data) {
            Ok(payload) => Self {
                raw: raw.to_string(),
                format: StreamFormat::ServerSentEvents,
                payload: Some(payload),
                error: None,
            },
            Err(e) => Self::invalid(raw, StreamFormat::ServerSentEvents, &e.to_string()),
        }
    }

    fn parse_ndjson(raw: &str) -> Self {
        let line = raw.trim();
        if line.is_empty() {
            return Self::invalid(raw, StreamFormat::NewlineDelimitedJson, "empty line");
        }
        match serde_json::from_str::<Value>(line) {
            Ok(payload) => Self {
                raw: raw.to_string(),
                format: StreamFormat::NewlineDelimitedJson,
                payload: Some(payload),
                error: None,
            },
            Err(e) => Self::invalid(raw, StreamFormat::NewlineDelimitedJson, &e.to_string()),
        }
    }

    fn invalid(raw: &str, format: StreamFormat, error: &str) -> Self {
        Self {
            raw: raw.to_string(),
            format,
            payload: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.payload.is_some()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn parse_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn payload_mut(&mut self) -> Option<&mut Value> {
        self.payload.as_mut()
    }

    /// Whether this event ends the stream (`[DONE]` sentinel or `done: true`).
    pub fn is_terminal(&self) -> bool {
        self.payload
            .as_ref()
            .and_then(|p| p.get("done"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// The content delta carried by this event, if any.
    pub fn content(&self) -> Option<&str> {
        let payload = self.payload.as_ref()?;
        match self.format {
            StreamFormat::ServerSentEvents => payload
                .pointer("/choices/0/delta/content")
                .and_then(Value::as_str),
            StreamFormat::NewlineDelimitedJson => {
                payload.pointer("/message/content").and_then(Value::as_str)
            }
        }
    }

    pub fn has_content(&self) -> bool {
        self.content().is_some_and(|c| !c.is_empty())
    }

    /// Token usage, when this event carries it.
    ///
    /// SSE events report a generic `usage` object. NDJSON upstreams only
    /// report counters on their terminal line, using provider-native names
    /// (`prompt_eval_count`, `eval_count`) with a generic `usage` fallback.
    pub fn usage(&self) -> Option<Usage> {
        let payload = self.payload.as_ref()?;
        match self.format {
            StreamFormat::ServerSentEvents => usage_from_object(payload.get("usage")?),
            StreamFormat::NewlineDelimitedJson => {
                if !self.is_terminal() {
                    return None;
                }
                let prompt = payload.get("prompt_eval_count").and_then(Value::as_u64);
                let completion = payload.get("eval_count").and_then(Value::as_u64);
                if prompt.is_some() || completion.is_some() {
                    return Some(Usage {
                        prompt_tokens: prompt.unwrap_or(0),
                        completion_tokens: completion.unwrap_or(0),
                    });
                }
                usage_from_object(payload.get("usage")?)
            }
        }
    }
}

fn usage_from_object(usage: &Value) -> Option<Usage> {
    let prompt = usage.get("prompt_tokens").and_then(Value::as_u64);
    let completion = usage.get("completion_tokens").and_then(Value::as_u64);
    if prompt.is_none() && completion.is_none() {
        return None;
    }
    Some(Usage {
        prompt_tokens: prompt.unwrap_or(0),
        completion_tokens: completion.unwrap_or(0),
    })
}

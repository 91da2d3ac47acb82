use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Inbound chat-completion request.
///
/// Only the fields the gateway itself reads are typed; everything else is
/// carried through to the upstream untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// String or structured content, forwarded as-is
    pub content: Value,
}

impl ChatCompletionRequest {
    /// Serialize the request body for the upstream, with streaming forced on.
    pub fn to_upstream_body(&self) -> Result<Bytes> {
        let mut request = self.clone();
        request.stream = true;
        Ok(Bytes::from(serde_json::to_vec(&request)?))
    }
}

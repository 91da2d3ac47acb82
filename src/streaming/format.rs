/// Wire framing of an upstream streaming response.
///
/// Closed set on purpose: parsing and normalization match exhaustively on it,
/// so a third framing is a compile-time-checked extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// `data: <json>\n\n` events, terminated by `data: [DONE]`.
    ServerSentEvents,
    /// One complete JSON value per line.
    NewlineDelimitedJson,
}

impl StreamFormat {
    /// Event delimiter for this framing.
    pub fn delimiter(&self) -> &'static str {
        match self {
            StreamFormat::ServerSentEvents => "\n\n",
            StreamFormat::NewlineDelimitedJson => "\n",
        }
    }

    /// Classify buffered text as one of the two framings.
    ///
    /// Pure heuristic, applied once per request to the first non-empty
    /// buffered text (the decision is sticky; content substrings later in the
    /// stream can spuriously resemble the other framing). SSE is the default
    /// because an SSE scanner degrades gracefully on stray lines, while
    /// treating malformed input as NDJSON produces parse-failure noise.
    pub fn detect(text: &str) -> StreamFormat {
        if text.contains("data:") || text.starts_with(':') {
            return StreamFormat::ServerSentEvents;
        }
        if serde_json::from_str::<serde_json::Value>(text.trim()).is_ok() {
            return StreamFormat::NewlineDelimitedJson;
        }
        StreamFormat::ServerSentEvents
    }
}

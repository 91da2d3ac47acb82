use tracing::warn;

use super::format::StreamFormat;

/// Default ceiling on buffered, not-yet-delimited text (1 MiB).
pub const DEFAULT_BUFFER_CEILING: usize = 1024 * 1024;

/// Accumulates decoded text and yields complete logical events.
///
/// The delimiter depends on the stream's framing, which is decided here from
/// the first non-empty buffered text and is sticky for the rest of the
/// request. Memory is bounded: when the buffer outgrows its ceiling, the
/// oldest half is discarded. A stalled or malicious producer costs us a
/// partial fragment, not unbounded growth.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: String,
    format: Option<StreamFormat>,
    ceiling: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_ceiling(DEFAULT_BUFFER_CEILING)
    }

    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            buf: String::new(),
            format: None,
            ceiling,
        }
    }

    /// Framing decided for this request, if any text has arrived yet.
    pub fn format(&self) -> Option<StreamFormat> {
        self.format
    }

    pub fn append(&mut self, text: &str) {
        self.buf.push_str(text);

        if self.buf.len() > self.ceiling {
            let mut mid = self.buf.len() / 2;
            while !self.buf.is_char_boundary(mid) {
                mid += 1;
            }
            warn!(
                buffered = self.buf.len(),
                ceiling = self.ceiling,
                dropped = mid,
                "frame buffer over ceiling, discarding oldest half"
            );
            self.buf.drain(..mid);
        }
    }

    /// Extract all delimiter-terminated events, retaining the trailing
    /// remainder.
    ///
    /// The first call that sees a complete non-empty line fixes the stream
    /// format for the rest of the request. Detection waits for a full line so
    /// the decision does not depend on where network chunk boundaries fall:
    /// a partial `{"mess` prefix must not classify differently from the
    /// complete line it belongs to.
    pub fn extract_complete(&mut self) -> Vec<String> {
        if self.format.is_none() {
            let Some(probe) = first_complete_line(&self.buf) else {
                return Vec::new();
            };
            self.format = Some(StreamFormat::detect(probe));
        }
        let delimiter = self.format.expect("format fixed above").delimiter();

        let mut events = Vec::new();
        while let Some(pos) = self.buf.find(delimiter) {
            let event: String = self.buf.drain(..pos + delimiter.len()).collect();
            events.push(event[..pos].to_string());
        }
        events
    }

    /// Take whatever partial event remains at end of input.
    pub fn flush_remainder(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// First newline-terminated line with non-whitespace content, if any.
fn first_complete_line(buf: &str) -> Option<&str> {
    let terminated = &buf[..buf.rfind('\n')? + 1];
    terminated.lines().find(|line| !line.trim().is_empty())
}

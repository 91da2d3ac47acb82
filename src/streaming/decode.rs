use bytes::{BufMut, BytesMut};
use tracing::warn;

/// Consecutive decodes failing on the same invalid byte run before the tail is
/// force-decoded lossily.
const MAX_STALLED_DECODES: u32 = 3;

/// Incremental UTF-8 decoder with cross-chunk recovery.
///
/// Network chunk boundaries never align with code point boundaries, so a
/// multi-byte sequence routinely arrives split across two reads. The decoder
/// keeps the undecodable tail of each call and prepends it to the next chunk.
/// An incomplete trailing sequence waits for more bytes indefinitely; only
/// bytes that can never decode (`Utf8Error::error_len()` is `Some`) count as
/// stalls, and after [`MAX_STALLED_DECODES`] consecutive failures the tail is
/// force-decoded with U+FFFD substitution so the stream keeps moving.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: BytesMut,
    stalled_decodes: u32,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::new(),
            stalled_decodes: 0,
        }
    }

    /// Decode a raw chunk, returning all text that is valid so far.
    ///
    /// Never fails: invalid or incomplete trailing bytes are retained for the
    /// next call, and pathological runs are eventually substituted.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        if chunk.is_empty() && self.pending.is_empty() {
            return String::new();
        }

        let mut data = std::mem::take(&mut self.pending);
        data.put_slice(chunk);

        match std::str::from_utf8(&data) {
            Ok(text) => {
                self.stalled_decodes = 0;
                text.to_string()
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                let text = String::from_utf8_lossy(&data[..valid_up_to]).into_owned();
                self.pending = data.split_off(valid_up_to);

                // error_len() == None is an incomplete sequence at the end of
                // input, which just needs more bytes and is never a stall.
                if e.error_len().is_some() {
                    self.stalled_decodes += 1;
                } else {
                    self.stalled_decodes = 0;
                }

                if self.stalled_decodes >= MAX_STALLED_DECODES {
                    warn!(
                        tail_len = self.pending.len(),
                        "UTF-8 tail stalled, force-decoding with substitution"
                    );
                    let forced = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    self.stalled_decodes = 0;
                    return text + &forced;
                }

                text
            }
        }
    }

    /// Drain any pending tail at end of input, substituting undecodable bytes.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.stalled_decodes = 0;
        text
    }

    /// Number of bytes held back waiting for the rest of a sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

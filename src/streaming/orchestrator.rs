use bytes::Bytes;
use futures::Stream;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tracing::debug;

use crate::error::GatewayError;

use super::buffer::FrameBuffer;
use super::decode::Utf8StreamDecoder;
use super::event::{ParsedEvent, Usage};
use super::format::StreamFormat;
use super::normalize;

/// Identity of the request being streamed, used for canonical chunk fields
/// and the end-of-stream report.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub request_id: String,
    pub user_id: String,
    pub model: String,
}

/// Totals accumulated over one request's stream.
#[derive(Debug, Default, Clone)]
pub struct AccumulatedState {
    pub full_content: String,
    pub usage: Option<Usage>,
    pub chunk_count: u64,
    pub errored: bool,
}

/// The one record handed to the logging collaborator when a stream ends.
#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub request_id: String,
    pub user_id: String,
    pub model: String,
    pub full_content: String,
    pub usage: Option<Usage>,
    pub chunk_count: u64,
    pub errored: bool,
    pub duration_ms: u64,
}

/// Logging collaborator, injected at construction. The engine holds no
/// global mutable state.
pub trait StreamReporter: Send + Sync {
    fn record(&self, record: StreamRecord);
}

/// Reporter that drops records, for tests and detached use.
pub struct NoopReporter;

impl StreamReporter for NoopReporter {
    fn record(&self, _record: StreamRecord) {}
}

enum Phase {
    Streaming,
    Finished,
}

/// Per-request state machine driving decode → buffer → parse → normalize.
///
/// Wraps the upstream byte stream as a `Stream` of canonical output frames.
/// Both ends are pull-based: the next upstream chunk is only requested once
/// the downstream consumer has taken the previous output, so a slow client
/// throttles upstream consumption. Dropping the stream releases the upstream
/// connection.
///
/// A stream ends exactly one way: a clean upstream end flushes the remaining
/// partial event and emits the terminal sentinel; an upstream failure emits
/// one synthetic error frame and suppresses the sentinel.
pub struct StreamOrchestrator<S> {
    upstream: Option<S>,
    decoder: Utf8StreamDecoder,
    buffer: FrameBuffer,
    ctx: StreamContext,
    state: AccumulatedState,
    output: VecDeque<Bytes>,
    phase: Phase,
    reporter: Arc<dyn StreamReporter>,
    started: Instant,
}

impl<S> StreamOrchestrator<S> {
    pub fn new(upstream: S, ctx: StreamContext, reporter: Arc<dyn StreamReporter>) -> Self {
        Self::with_buffer_ceiling(upstream, ctx, reporter, super::buffer::DEFAULT_BUFFER_CEILING)
    }

    pub fn with_buffer_ceiling(
        upstream: S,
        ctx: StreamContext,
        reporter: Arc<dyn StreamReporter>,
        ceiling: usize,
    ) -> Self {
        Self {
            upstream: Some(upstream),
            decoder: Utf8StreamDecoder::new(),
            buffer: FrameBuffer::with_ceiling(ceiling),
            ctx,
            state: AccumulatedState::default(),
            output: VecDeque::new(),
            phase: Phase::Streaming,
            reporter,
            started: Instant::now(),
        }
    }

    fn process_chunk(&mut self, chunk: &[u8]) {
        let text = self.decoder.decode(chunk);
        if !text.is_empty() {
            self.buffer.append(&text);
        }
        for raw in self.buffer.extract_complete() {
            let format = self.buffer.format().expect("format fixed by extraction");
            self.process_event(&raw, format);
        }
    }

    fn process_event(&mut self, raw: &str, format: StreamFormat) {
        if raw.trim().is_empty() {
            return;
        }
        let event = ParsedEvent::parse(raw, format);
        if !event.is_valid() {
            debug!(
                request_id = %self.ctx.request_id,
                error = event.parse_error().unwrap_or("unknown"),
                "dropping unparseable event"
            );
            return;
        }

        if let Some(content) = event.content() {
            self.state.full_content.push_str(content);
        }
        if let Some(usage) = event.usage() {
            self.state.usage = Some(usage);
        }

        if let Some(frame) = normalize::to_canonical(&event, &self.ctx.model, &self.ctx.request_id)
        {
            self.state.chunk_count += 1;
            self.output.push_back(frame);
        }
    }

    /// Flush everything still in flight: the decoder tail, any now-complete
    /// events, and a final event that never got its trailing delimiter.
    fn drain_pending(&mut self) {
        let tail = self.decoder.finish();
        if !tail.is_empty() {
            self.buffer.append(&tail);
        }
        for raw in self.buffer.extract_complete() {
            let format = self.buffer.format().expect("format fixed by extraction");
            self.process_event(&raw, format);
        }
        let remainder = self.buffer.flush_remainder();
        if !remainder.trim().is_empty() {
            let format = self
                .buffer
                .format()
                .unwrap_or_else(|| StreamFormat::detect(&remainder));
            self.process_event(&remainder, format);
        }
    }

    /// Clean upstream end: flush the tail, emit the terminal sentinel.
    fn complete(&mut self) {
        self.drain_pending();
        self.output.push_back(normalize::sentinel_frame());
        self.finish();
    }

    /// Faulted upstream: flush what was already delivered, then one synthetic
    /// error frame and no sentinel.
    fn fault(&mut self, error: GatewayError) {
        self.drain_pending();
        let (message, code) = error.error_frame_fields();
        self.state.errored = true;
        self.output.push_back(normalize::error_frame(&message, &code));
        self.upstream = None;
        self.finish();
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.upstream = None;
        self.reporter.record(StreamRecord {
            request_id: self.ctx.request_id.clone(),
            user_id: self.ctx.user_id.clone(),
            model: self.ctx.model.clone(),
            full_content: std::mem::take(&mut self.state.full_content),
            usage: self.state.usage,
            chunk_count: self.state.chunk_count,
            errored: self.state.errored,
            duration_ms: self.started.elapsed().as_millis() as u64,
        });
    }
}

impl<S, E> Stream for StreamOrchestrator<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(frame) = this.output.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if matches!(this.phase, Phase::Finished) {
                return Poll::Ready(None);
            }

            let Some(upstream) = this.upstream.as_mut() else {
                return Poll::Ready(None);
            };
            match Pin::new(upstream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.process_chunk(&chunk),
                Poll::Ready(Some(Err(e))) => {
                    this.fault(GatewayError::UpstreamNetwork(e.to_string()));
                }
                Poll::Ready(None) => this.complete(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::streaming::{StreamRecord, StreamReporter};

/// Gateway-level counters.
///
/// Thread-safe atomic counters, updated once per finished stream.
#[derive(Default)]
pub struct GatewayMetrics {
    /// Streams that reached a terminal state (completed or errored)
    pub streams_finished: AtomicU64,

    /// Streams that ended with a synthetic error frame
    pub streams_errored: AtomicU64,

    /// Canonical chunks forwarded downstream
    pub chunks_forwarded: AtomicU64,

    /// Total stream duration in milliseconds
    pub total_duration_ms: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stream(&self, record: &StreamRecord) {
        self.streams_finished.fetch_add(1, Ordering::Relaxed);
        if record.errored {
            self.streams_errored.fetch_add(1, Ordering::Relaxed);
        }
        self.chunks_forwarded
            .fetch_add(record.chunk_count, Ordering::Relaxed);
        self.total_duration_ms
            .fetch_add(record.duration_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            streams_finished: self.streams_finished.load(Ordering::Relaxed),
            streams_errored: self.streams_errored.load(Ordering::Relaxed),
            chunks_forwarded: self.chunks_forwarded.load(Ordering::Relaxed),
            total_duration_ms: self.total_duration_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub streams_finished: u64,
    pub streams_errored: u64,
    pub chunks_forwarded: u64,
    pub total_duration_ms: u64,
}

/// Default logging collaborator: emits one structured log line per finished
/// stream and feeds the counters.
pub struct TracingReporter {
    metrics: Arc<GatewayMetrics>,
}

impl TracingReporter {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self { metrics }
    }
}

impl StreamReporter for TracingReporter {
    fn record(&self, record: StreamRecord) {
        self.metrics.record_stream(&record);
        info!(
            request_id = %record.request_id,
            user_id = %record.user_id,
            model = %record.model,
            content_len = record.full_content.len(),
            prompt_tokens = record.usage.map(|u| u.prompt_tokens),
            completion_tokens = record.usage.map(|u| u.completion_tokens),
            chunk_count = record.chunk_count,
            errored = record.errored,
            duration_ms = record.duration_ms,
            "stream finished"
        );
    }
}

use bytes::Bytes;
use futures::StreamExt;
use std::io;
use std::sync::{Arc, Mutex};

use stream_gateway::streaming::{
    StreamContext, StreamOrchestrator, StreamRecord, StreamReporter,
};

struct CaptureReporter {
    records: Mutex<Vec<StreamRecord>>,
}

impl CaptureReporter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
        })
    }

    fn last(&self) -> StreamRecord {
        self.records.lock().unwrap().last().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl StreamReporter for CaptureReporter {
    fn record(&self, record: StreamRecord) {
        self.records.lock().unwrap().push(record);
    }
}

fn ctx() -> StreamContext {
    StreamContext {
        request_id: "itest".to_string(),
        user_id: "user".to_string(),
        model: "test-model".to_string(),
    }
}

/// Run the orchestrator over the given upstream chunks, returning the output
/// frames as strings.
async fn run(chunks: Vec<Vec<u8>>, reporter: Arc<CaptureReporter>) -> Vec<String> {
    let upstream = futures::stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, io::Error>(Bytes::from(c)))
            .collect::<Vec<_>>(),
    );
    StreamOrchestrator::new(upstream, ctx(), reporter)
        .map(|r| String::from_utf8(r.unwrap().to_vec()).unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn sse_scenario_accumulates_hello() {
    let reporter = CaptureReporter::new();
    let frames = run(
        vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n".to_vec(),
            b"data: [DONE]\n\n".to_vec(),
        ],
        reporter.clone(),
    )
    .await;

    let record = reporter.last();
    assert_eq!(record.full_content, "Hello");
    assert!(!record.errored);
    assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
    assert!(frames.iter().all(|f| !f.contains("\"error\"")));
}

#[tokio::test]
async fn ndjson_scenario_normalizes_to_canonical_chunks() {
    let reporter = CaptureReporter::new();
    let frames = run(
        vec![
            b"{\"message\":{\"content\":\"Hi\"}}\n".to_vec(),
            b"{\"message\":{\"content\":\" there\"}}\n".to_vec(),
            b"{\"done\":true,\"prompt_eval_count\":5,\"eval_count\":3}\n".to_vec(),
        ],
        reporter.clone(),
    )
    .await;

    // Two canonical content chunks, no chunk for the terminal line, then the
    // synthesized sentinel.
    assert_eq!(frames.len(), 3);
    for frame in &frames[..2] {
        let json: serde_json::Value =
            serde_json::from_str(frame.strip_prefix("data: ").unwrap().trim()).unwrap();
        assert_eq!(json["object"], "chat.completion.chunk");
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["id"], "chatcmpl-itest");
    }
    assert_eq!(frames[2], "data: [DONE]\n\n");

    let record = reporter.last();
    assert_eq!(record.full_content, "Hi there");
    let usage = record.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 5);
    assert_eq!(usage.completion_tokens, 3);
}

#[tokio::test]
async fn malformed_line_between_valid_lines_is_dropped() {
    let reporter = CaptureReporter::new();
    let frames = run(
        vec![
            b"{\"message\":{\"content\":\"a\"}}\n".to_vec(),
            b"{\"message\":{content\n".to_vec(),
            b"{\"message\":{\"content\":\"b\"}}\n".to_vec(),
        ],
        reporter.clone(),
    )
    .await;

    assert_eq!(frames.len(), 3); // a, b, sentinel
    assert_eq!(reporter.last().full_content, "ab");
    assert!(!reporter.last().errored);
}

#[tokio::test]
async fn split_multibyte_code_point_reassembled() {
    let reporter = CaptureReporter::new();
    // "Р" (0xD0 0xA0) split across two network chunks
    let full = "{\"message\":{\"content\":\"\u{0420}\"}}\n".as_bytes().to_vec();
    let split_at = full.iter().position(|&b| b == 0xD0).unwrap() + 1;
    let frames = run(
        vec![full[..split_at].to_vec(), full[split_at..].to_vec()],
        reporter.clone(),
    )
    .await;

    assert!(frames[0].contains('\u{0420}'));
    assert_eq!(reporter.last().full_content, "\u{0420}");
}

#[tokio::test]
async fn chunk_boundary_invariance_sse() {
    let input: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"\xD0\xA0h\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"i!\"}}],\"usage\":{\"prompt_tokens\":7,\"completion_tokens\":2}}\n\ndata: [DONE]\n\n";

    let baseline = CaptureReporter::new();
    run(vec![input.to_vec()], baseline.clone()).await;
    let expected = baseline.last();
    assert_eq!(expected.full_content, "\u{0420}hi!");

    // Split at every byte offset, including inside the multi-byte code point,
    // inside JSON tokens, and inside the "data: " prefix.
    for split in 1..input.len() {
        let reporter = CaptureReporter::new();
        run(
            vec![input[..split].to_vec(), input[split..].to_vec()],
            reporter.clone(),
        )
        .await;
        let record = reporter.last();
        assert_eq!(record.full_content, expected.full_content, "split at {split}");
        assert_eq!(record.usage, expected.usage, "split at {split}");
    }
}

#[tokio::test]
async fn chunk_boundary_invariance_ndjson() {
    let input: &[u8] = "{\"message\":{\"content\":\"H\u{00e9}llo\"}}\n{\"done\":true,\"prompt_eval_count\":4,\"eval_count\":9}\n"
        .as_bytes();

    let baseline = CaptureReporter::new();
    run(vec![input.to_vec()], baseline.clone()).await;
    let expected = baseline.last();
    assert_eq!(expected.full_content, "H\u{00e9}llo");

    for split in 1..input.len() {
        let reporter = CaptureReporter::new();
        run(
            vec![input[..split].to_vec(), input[split..].to_vec()],
            reporter.clone(),
        )
        .await;
        let record = reporter.last();
        assert_eq!(record.full_content, expected.full_content, "split at {split}");
        assert_eq!(record.usage, expected.usage, "split at {split}");
    }
}

#[tokio::test]
async fn byte_at_a_time_delivery_matches_single_chunk() {
    let input = "{\"message\":{\"content\":\"🎉\"}}\n".as_bytes();

    let baseline = CaptureReporter::new();
    run(vec![input.to_vec()], baseline.clone()).await;
    assert_eq!(baseline.last().full_content, "🎉");

    // One byte per network read: the four-byte code point spends three calls
    // as an incomplete tail and must still come out intact.
    let reporter = CaptureReporter::new();
    run(input.iter().map(|&b| vec![b]).collect(), reporter.clone()).await;
    assert_eq!(reporter.last().full_content, "🎉");
}

#[tokio::test]
async fn format_decision_is_sticky_across_chunks() {
    let reporter = CaptureReporter::new();
    // NDJSON stream whose later content embeds an SSE-looking substring
    let frames = run(
        vec![
            b"{\"message\":{\"content\":\"first\"}}\n".to_vec(),
            b"{\"message\":{\"content\":\"data: not an event\"}}\n".to_vec(),
            b"{\"done\":true}\n".to_vec(),
        ],
        reporter.clone(),
    )
    .await;

    // Both lines normalized as NDJSON content, not re-detected as SSE
    assert_eq!(frames.len(), 3);
    assert_eq!(reporter.last().full_content, "firstdata: not an event");
}

#[tokio::test]
async fn final_event_without_trailing_delimiter_is_flushed() {
    let reporter = CaptureReporter::new();
    let frames = run(
        vec![b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}".to_vec()],
        reporter.clone(),
    )
    .await;

    assert!(frames[0].contains("tail"));
    assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
    assert_eq!(reporter.last().full_content, "tail");
}

#[tokio::test]
async fn successful_stream_has_exactly_one_sentinel() {
    let reporter = CaptureReporter::new();
    // Upstream sends its own [DONE]; downstream still sees exactly one
    let frames = run(
        vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\ndata: [DONE]\n\n".to_vec(),
        ],
        reporter.clone(),
    )
    .await;

    assert_eq!(frames.iter().filter(|f| f.contains("[DONE]")).count(), 1);
    assert_eq!(reporter.count(), 1);
}

#[tokio::test]
async fn empty_upstream_still_terminates_cleanly() {
    let reporter = CaptureReporter::new();
    let frames = run(vec![], reporter.clone()).await;

    assert_eq!(frames, vec!["data: [DONE]\n\n".to_string()]);
    let record = reporter.last();
    assert_eq!(record.full_content, "");
    assert!(!record.errored);
}

#[tokio::test]
async fn sse_comment_and_event_lines_ignored() {
    let reporter = CaptureReporter::new();
    let frames = run(
        vec![
            b": keepalive\n\nevent: ping\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: [DONE]\n\n"
                .to_vec(),
        ],
        reporter.clone(),
    )
    .await;

    assert_eq!(reporter.last().full_content, "ok");
    assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
}

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use stream_gateway::streaming::{
    FrameBuffer, ParsedEvent, StreamFormat, Utf8StreamDecoder, normalize,
};

fn benchmark_decode(c: &mut Criterion) {
    let chunk = "data: {\"choices\":[{\"delta\":{\"content\":\"пример текста\"}}]}\n\n".as_bytes();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(chunk.len() as u64));
    group.bench_function("utf8_stream_decode", |b| {
        b.iter(|| {
            let mut decoder = Utf8StreamDecoder::new();
            black_box(decoder.decode(black_box(chunk)));
        });
    });
    group.finish();
}

fn benchmark_frame_extraction(c: &mut Criterion) {
    let text = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".repeat(64);

    c.bench_function("frame_buffer_extract", |b| {
        b.iter(|| {
            let mut buffer = FrameBuffer::new();
            buffer.append(black_box(&text));
            black_box(buffer.extract_complete());
        });
    });
}

fn benchmark_event_parse(c: &mut Criterion) {
    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"hello world\"}}]}";
    let ndjson = "{\"message\":{\"content\":\"hello world\"}}";

    c.bench_function("parse_sse_event", |b| {
        b.iter(|| black_box(ParsedEvent::parse(black_box(sse), StreamFormat::ServerSentEvents)));
    });
    c.bench_function("parse_ndjson_event", |b| {
        b.iter(|| {
            black_box(ParsedEvent::parse(
                black_box(ndjson),
                StreamFormat::NewlineDelimitedJson,
            ))
        });
    });
}

fn benchmark_normalize(c: &mut Criterion) {
    let event = ParsedEvent::parse(
        "{\"message\":{\"content\":\"hello world\"}}",
        StreamFormat::NewlineDelimitedJson,
    );

    c.bench_function("normalize_ndjson_to_canonical", |b| {
        b.iter(|| black_box(normalize::to_canonical(black_box(&event), "llama3", "bench")));
    });
}

criterion_group!(
    benches,
    benchmark_decode,
    benchmark_frame_extraction,
    benchmark_event_parse,
    benchmark_normalize
);
criterion_main!(benches);

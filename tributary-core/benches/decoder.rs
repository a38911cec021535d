use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use futures::executor::block_on;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use tributary_core::http::{RawStreamUnit, StreamHandle};
use tributary_core::providers::ProviderResult;
use tributary_core::streaming::{decode_stream, decode_unit, StreamFraming};

const DELTA: &str =
    r#"data: {"id":"chatcmpl-1","model":"gpt-4o-mini","choices":[{"index":0,"delta":{"content":"Hello there"},"finish_reason":null}]}"#;

struct Replay(VecDeque<RawStreamUnit>);

#[async_trait]
impl StreamHandle for Replay {
    async fn next_unit(&mut self) -> Option<ProviderResult<RawStreamUnit>> {
        self.0.pop_front().map(Ok)
    }

    fn close(&mut self) {}
}

fn transcript(deltas: usize) -> VecDeque<RawStreamUnit> {
    let mut units = VecDeque::with_capacity(deltas * 2 + 1);
    for _ in 0..deltas {
        units.push_back(RawStreamUnit::new(DELTA));
        units.push_back(RawStreamUnit::new(""));
    }
    units.push_back(RawStreamUnit::new("data: [DONE]"));
    units
}

fn bench_decode_unit(c: &mut Criterion) {
    let framing = StreamFraming::default();
    let delta = RawStreamUnit::new(DELTA);
    let comment = RawStreamUnit::new(": keep-alive");

    let mut group = c.benchmark_group("decode_unit");
    group.bench_function("delta", |b| b.iter(|| decode_unit(&framing, black_box(&delta))));
    group.bench_function("comment", |b| b.iter(|| decode_unit(&framing, black_box(&comment))));
    group.finish();
}

fn bench_decode_stream(c: &mut Criterion) {
    let framing = Arc::new(StreamFraming::default());

    let mut group = c.benchmark_group("decode_stream");
    for deltas in [16usize, 256] {
        group.throughput(Throughput::Elements(deltas as u64));
        group.bench_function(format!("{}_deltas", deltas), |b| {
            b.iter_batched(
                || Box::new(Replay(transcript(deltas))),
                |handle| block_on(decode_stream(handle, framing.clone()).count()),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode_unit, bench_decode_stream);
criterion_main!(benches);

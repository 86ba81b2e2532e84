use std::time::Instant;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rover_core::{HazardQueue, RangeSampler, SamplerCfg, SharedState};

// Synthetic trace: an obstacle approaching from 240 cm with a few bad echoes
fn synth_trace(n: usize) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| match i % 17 {
            0 => None,
            5 => Some(300.0),
            _ => Some(240.0 - (i % 240) as f64),
        })
        .collect()
}

pub fn bench_ingest(c: &mut Criterion) {
    let mut g = c.benchmark_group("ingest");
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(1));
    }
    let trace = synth_trace(4096);

    g.bench_function("trace_4096", |b| {
        b.iter_batched(
            || {
                let queue = HazardQueue::new(1);
                let sampler = RangeSampler::new(SamplerCfg::default(), SharedState::new(), queue.clone());
                (sampler, queue)
            },
            |(sampler, queue)| {
                let now = Instant::now();
                for &r in &trace {
                    black_box(sampler.ingest(black_box(r), now));
                    // Keep the queue from saturating so the push path stays hot.
                    let _ = queue.try_pop();
                }
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);

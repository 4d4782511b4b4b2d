use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use core_sim::{InstrumentDraft, PriceWalk, SimConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use runtime::{event_channel, metrics::JobMetrics, PriceSimulator};
use store::Store;

const BENCH_INSTRUMENTS: u64 = 100;

fn bench_price_run(c: &mut Criterion) {
    let store = Store::open_in_memory().expect("in-memory store should open");
    for i in 0..BENCH_INSTRUMENTS {
        let price = 10.0 + i as f64;
        store
            .insert_instrument(&InstrumentDraft {
                ticker: format!("T{i:03}"),
                company_name: format!("Company {i}"),
                price,
                volume: 1_000,
                day_high: price,
                day_low: price,
                day_start: price,
                day_end: price,
            })
            .expect("instrument insert should succeed");
    }

    let tx = event_channel(16);
    let _viewer = tx.subscribe();
    let metrics = Arc::new(JobMetrics::new());
    let mut sim = PriceSimulator::new(
        store,
        tx,
        PriceWalk::seeded(7, SimConfig::default()),
        FixedOffset::east_opt(0).expect("zero offset is valid"),
        metrics.clone(),
    );

    let mut group = c.benchmark_group("price_simulation");
    group.throughput(Throughput::Elements(BENCH_INSTRUMENTS));
    group.bench_function(BenchmarkId::new("run_once", BENCH_INSTRUMENTS), |b| {
        b.iter(|| black_box(sim.run_once(Utc::now())));
    });
    group.finish();

    if let Some(report) = metrics
        .snapshot(runtime::logging::JobKind::PriceSimulation)
        .durations
        .percentiles()
    {
        println!(
            "p50_micros={} p95_micros={} p99_micros={} max_micros={} samples={}",
            report.p50_micros, report.p95_micros, report.p99_micros, report.max_micros, report.count
        );
    }
}

criterion_group!(benches, bench_price_run);
criterion_main!(benches);

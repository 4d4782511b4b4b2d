use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use core_sim::{NewOrder, OrderSide};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use runtime::{
    event_channel, logging::InMemoryJobLogWriter, SettlementConfig, SettlementJob,
};
use store::Store;

const BENCH_ORDERS: u64 = 500;

fn seeded_store() -> Store {
    let store = Store::open_in_memory().expect("in-memory store should open");
    let placed = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
    for i in 0..BENCH_ORDERS as i64 {
        let side = if i % 3 == 2 { OrderSide::Sell } else { OrderSide::Buy };
        store
            .insert_order(
                &NewOrder {
                    user_id: 1 + i % 10,
                    stock_id: 1 + i % 5,
                    side,
                    quantity: 1 + i % 7,
                    price: 10.0 + (i % 13) as f64,
                },
                placed,
            )
            .expect("order insert should succeed");
    }
    store
}

fn bench_settlement_run(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap() + Duration::seconds(60);

    let mut group = c.benchmark_group("settlement");
    group.throughput(Throughput::Elements(BENCH_ORDERS));
    group.bench_function(BenchmarkId::new("run_once", BENCH_ORDERS), |b| {
        b.iter_batched(
            || {
                SettlementJob::new(
                    seeded_store(),
                    event_channel(16),
                    SettlementConfig::default(),
                    Arc::new(InMemoryJobLogWriter::new()),
                )
            },
            |mut job| black_box(job.run_once(now)),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_settlement_run);
criterion_main!(benches);

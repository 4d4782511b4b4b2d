use std::sync::Arc;

use api::AppState;
use axum::{routing::get, Router};
use core_sim::{MarketEvent, PriceWalk, SimConfig};
use runtime::{
    logging::{JobKind, JobLogWriter},
    metrics::JobMetrics,
    JobScheduler, MarketCalendarJob, PriceSimulator, SettlementConfig,
    SettlementJob,
};
use store::Store;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::Config;

pub fn build_app(state: AppState) -> Router {
    api::app(state).route("/health", get(healthcheck))
}

async fn healthcheck() -> &'static str {
    "ok"
}

/// Schedules settlement, the price walk and the calendar check, all sharing
/// one store and one event channel.
pub fn spawn_jobs(
    scheduler: &mut JobScheduler,
    config: &Config,
    store: &Store,
    events_tx: &broadcast::Sender<MarketEvent>,
    log: Arc<dyn JobLogWriter>,
) {
    let settlement = SettlementJob::new(
        store.clone(),
        events_tx.clone(),
        SettlementConfig {
            delay: config.settlement_delay,
            rejected_sell: config.rejected_sell,
            enforce_market_hours: config.enforce_market_hours,
        },
        Arc::clone(&log),
    );
    let prices = PriceSimulator::new(
        store.clone(),
        events_tx.clone(),
        PriceWalk::new(SimConfig::default()),
        config.market_offset,
        Arc::clone(&log),
    );
    let calendar = MarketCalendarJob::new(store.clone(), events_tx.clone(), config.market_offset, log);

    scheduler.spawn(settlement, config.settlement_interval);
    scheduler.spawn(prices, config.price_interval);
    scheduler.spawn(calendar, config.price_interval);
}

/// One line per job with its counters and recent run-time percentiles.
pub fn log_job_summary(metrics: &JobMetrics) {
    for job in [JobKind::Settlement, JobKind::PriceSimulation, JobKind::MarketCalendar] {
        let counters = metrics.snapshot(job);
        let p95_micros = counters.durations.percentiles().map(|p| p.p95_micros);
        info!(
            job = job.as_str(),
            runs = counters.runs,
            executed = counters.executed,
            rejected = counters.rejected,
            errors = counters.errors,
            prices_updated = counters.prices_updated,
            status_changes = counters.status_changes,
            p95_micros,
            "job summary"
        );
    }
}

use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Duration, Utc};
use core_sim::{MarketEvent, Order};
use store::{RejectedSellPolicy, SettlementOutcome, Store};
use tracing::{debug, error, info, warn};

use crate::{
    events::EventPublisher,
    logging::{JobKind, JobLogEvent, JobLogEventKind, JobLogWriter},
    scheduler::Job,
};

pub const DEFAULT_SETTLEMENT_DELAY_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementConfig {
    /// Minimum order age before it is eligible.
    pub delay: Duration,
    pub rejected_sell: RejectedSellPolicy,
    /// Skip whole runs while the stored market flag says closed.
    pub enforce_market_hours: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            delay: Duration::seconds(DEFAULT_SETTLEMENT_DELAY_SECS),
            rejected_sell: RejectedSellPolicy::default(),
            enforce_market_hours: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementReport {
    pub eligible: usize,
    pub executed: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub errors: usize,
    pub market_closed: bool,
}

/// Promotes aged PENDING orders and applies their ledger effects, one
/// transaction per order.
pub struct SettlementJob<P> {
    store: Store,
    publisher: P,
    config: SettlementConfig,
    log: Arc<dyn JobLogWriter>,
    runs: u64,
}

impl<P: EventPublisher> SettlementJob<P> {
    pub fn new(
        store: Store,
        publisher: P,
        config: SettlementConfig,
        log: Arc<dyn JobLogWriter>,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
            log,
            runs: 0,
        }
    }

    pub fn run_once(&mut self, now: DateTime<Utc>) -> SettlementReport {
        self.runs += 1;
        let run = self.runs;
        let started = Instant::now();
        let mut report = SettlementReport::default();
        self.record(JobLogEvent::new(run, JobKind::Settlement, JobLogEventKind::RunStarted));

        if self.config.enforce_market_hours && !self.market_is_open() {
            report.market_closed = true;
            debug!(run, "market closed, settlement run skipped");
            self.record(JobLogEvent::new(run, JobKind::Settlement, JobLogEventKind::RunSkipped));
            self.finish(run, started);
            return report;
        }

        let cutoff = now - self.config.delay;
        let orders = match self.store.eligible_orders(cutoff) {
            Ok(orders) => orders,
            Err(err) => {
                error!(run, error = %err, "failed to load pending orders");
                report.errors += 1;
                self.finish(run, started);
                return report;
            }
        };
        report.eligible = orders.len();

        for order in &orders {
            match self.store.settle_order(order, self.config.rejected_sell) {
                Ok(outcome @ SettlementOutcome::Bought { holding }) => {
                    report.executed += 1;
                    info!(
                        transaction_id = order.id,
                        user_id = order.user_id,
                        stock_id = order.stock_id,
                        quantity = holding.quantity,
                        average_price = holding.average_price,
                        "buy executed"
                    );
                    self.settled(run, order, JobLogEventKind::OrderExecuted, outcome);
                }
                Ok(outcome @ SettlementOutcome::Sold { proceeds, .. }) => {
                    report.executed += 1;
                    info!(
                        transaction_id = order.id,
                        user_id = order.user_id,
                        stock_id = order.stock_id,
                        proceeds,
                        "sell executed"
                    );
                    self.settled(run, order, JobLogEventKind::OrderExecuted, outcome);
                }
                Ok(outcome @ SettlementOutcome::SellRejected { held, requested, status }) => {
                    report.rejected += 1;
                    error!(
                        transaction_id = order.id,
                        user_id = order.user_id,
                        held,
                        requested,
                        %status,
                        "insufficient shares for sell, no ledger change"
                    );
                    self.settled(run, order, JobLogEventKind::OrderRejected, outcome);
                }
                Ok(outcome @ SettlementOutcome::Unsettleable { requested }) => {
                    report.rejected += 1;
                    error!(
                        transaction_id = order.id,
                        user_id = order.user_id,
                        requested,
                        price = order.price,
                        "order value out of range, marked failed"
                    );
                    self.settled(run, order, JobLogEventKind::OrderRejected, outcome);
                }
                Ok(SettlementOutcome::Skipped) => {
                    report.skipped += 1;
                    debug!(transaction_id = order.id, "order no longer pending, skipped");
                    self.record(
                        JobLogEvent::new(run, JobKind::Settlement, JobLogEventKind::OrderSkipped)
                            .about(order.id),
                    );
                }
                Err(err) => {
                    report.errors += 1;
                    warn!(transaction_id = order.id, error = %err, "settlement rolled back, order stays pending");
                    self.record(
                        JobLogEvent::new(run, JobKind::Settlement, JobLogEventKind::OrderErrored)
                            .about(order.id),
                    );
                }
            }
        }

        if report.eligible > 0 {
            info!(
                run,
                eligible = report.eligible,
                executed = report.executed,
                rejected = report.rejected,
                skipped = report.skipped,
                errors = report.errors,
                "settlement run finished"
            );
        }
        self.finish(run, started);
        report
    }

    fn market_is_open(&self) -> bool {
        match self.store.market_schedule() {
            Ok(Some(schedule)) => schedule.status,
            Ok(None) => {
                warn!("market schedule missing, treating market as closed");
                false
            }
            Err(err) => {
                error!(error = %err, "failed to read market schedule");
                false
            }
        }
    }

    fn settled(&self, run: u64, order: &Order, kind: JobLogEventKind, outcome: SettlementOutcome) {
        if let Some(status) = outcome.final_status() {
            self.publisher
                .publish(MarketEvent::order_settled(order.id, order.user_id, status));
        }
        self.record(JobLogEvent::new(run, JobKind::Settlement, kind).about(order.id));
    }

    fn finish(&self, run: u64, started: Instant) {
        let micros = started.elapsed().as_micros() as u64;
        self.record(
            JobLogEvent::new(run, JobKind::Settlement, JobLogEventKind::RunFinished)
                .finished_after(micros),
        );
    }

    fn record(&self, event: JobLogEvent) {
        self.log.write(event);
    }
}

impl<P: EventPublisher + 'static> Job for SettlementJob<P> {
    fn kind(&self) -> JobKind {
        JobKind::Settlement
    }

    fn run(&mut self, now: DateTime<Utc>) {
        self.run_once(now);
    }
}

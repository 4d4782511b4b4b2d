use std::{sync::Arc, time::Instant};

use chrono::{DateTime, FixedOffset, Utc};
use core_sim::{MarketEvent, PriceWalk};
use store::Store;
use tracing::{debug, error, warn};

use crate::{
    events::EventPublisher,
    logging::{JobKind, JobLogEvent, JobLogEventKind, JobLogWriter},
    scheduler::Job,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceRunReport {
    pub updated: usize,
    pub failed: usize,
    /// Viewers that received the resulting `stock_update`.
    pub delivered: usize,
}

/// Random-walks every instrument once per run and pushes the new list.
pub struct PriceSimulator<P> {
    store: Store,
    publisher: P,
    walk: PriceWalk,
    /// Offset used to stamp history points with a local `HH:MM`.
    offset: FixedOffset,
    log: Arc<dyn JobLogWriter>,
    runs: u64,
}

impl<P: EventPublisher> PriceSimulator<P> {
    pub fn new(
        store: Store,
        publisher: P,
        walk: PriceWalk,
        offset: FixedOffset,
        log: Arc<dyn JobLogWriter>,
    ) -> Self {
        Self {
            store,
            publisher,
            walk,
            offset,
            log,
            runs: 0,
        }
    }

    pub fn run_once(&mut self, now: DateTime<Utc>) -> PriceRunReport {
        self.runs += 1;
        let run = self.runs;
        let started = Instant::now();
        let mut report = PriceRunReport::default();
        self.record(JobLogEvent::new(run, JobKind::PriceSimulation, JobLogEventKind::RunStarted));

        let instruments = match self.store.list_instruments() {
            Ok(instruments) => instruments,
            Err(err) => {
                error!(run, error = %err, "failed to load instruments for price run");
                self.finish(run, started);
                return report;
            }
        };

        let time_of_day = now.with_timezone(&self.offset).format("%H:%M").to_string();
        let cap = self.walk.config().history_cap;

        for mut instrument in instruments {
            let next = self.walk.next_price(instrument.current_price);
            instrument.apply_price(next, time_of_day.clone(), cap);

            match self.store.save_price_tick(&instrument) {
                Ok(()) => {
                    report.updated += 1;
                    self.record(
                        JobLogEvent::new(run, JobKind::PriceSimulation, JobLogEventKind::PriceUpdated)
                            .about(instrument.id),
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(stock_id = instrument.id, ticker = %instrument.ticker, error = %err, "price update not saved");
                    self.record(
                        JobLogEvent::new(run, JobKind::PriceSimulation, JobLogEventKind::PriceErrored)
                            .about(instrument.id),
                    );
                }
            }
        }

        match self.store.list_instruments() {
            Ok(stocks) => {
                report.delivered = self.publisher.publish(MarketEvent::stock_update(stocks));
            }
            Err(err) => error!(run, error = %err, "failed to reload instruments for broadcast"),
        }

        debug!(
            run,
            updated = report.updated,
            failed = report.failed,
            viewers = report.delivered,
            "price run finished"
        );
        self.finish(run, started);
        report
    }

    fn finish(&self, run: u64, started: Instant) {
        let micros = started.elapsed().as_micros() as u64;
        self.record(
            JobLogEvent::new(run, JobKind::PriceSimulation, JobLogEventKind::RunFinished)
                .finished_after(micros),
        );
    }

    fn record(&self, event: JobLogEvent) {
        self.log.write(event);
    }
}

impl<P: EventPublisher + 'static> Job for PriceSimulator<P> {
    fn kind(&self) -> JobKind {
        JobKind::PriceSimulation
    }

    fn run(&mut self, now: DateTime<Utc>) {
        self.run_once(now);
    }
}

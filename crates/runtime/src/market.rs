use std::{sync::Arc, time::Instant};

use chrono::{DateTime, FixedOffset, Utc};
use core_sim::MarketEvent;
use store::Store;
use tracing::{error, info, warn};

use crate::{
    events::EventPublisher,
    logging::{JobKind, JobLogEvent, JobLogEventKind, JobLogWriter},
    scheduler::Job,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarOutcome {
    Unchanged { open: bool },
    Changed { open: bool },
    /// No schedule row, or it could not be read or written.
    Unavailable,
}

/// Keeps the stored open/closed flag in line with the schedule window.
pub struct MarketCalendarJob<P> {
    store: Store,
    publisher: P,
    offset: FixedOffset,
    log: Arc<dyn JobLogWriter>,
    runs: u64,
}

impl<P: EventPublisher> MarketCalendarJob<P> {
    pub fn new(store: Store, publisher: P, offset: FixedOffset, log: Arc<dyn JobLogWriter>) -> Self {
        Self {
            store,
            publisher,
            offset,
            log,
            runs: 0,
        }
    }

    pub fn run_once(&mut self, now: DateTime<Utc>) -> CalendarOutcome {
        self.runs += 1;
        let run = self.runs;
        let started = Instant::now();
        self.log
            .write(JobLogEvent::new(run, JobKind::MarketCalendar, JobLogEventKind::RunStarted));

        let outcome = self.reconcile(run, now);

        let micros = started.elapsed().as_micros() as u64;
        self.log.write(
            JobLogEvent::new(run, JobKind::MarketCalendar, JobLogEventKind::RunFinished)
                .finished_after(micros),
        );
        outcome
    }

    fn reconcile(&self, run: u64, now: DateTime<Utc>) -> CalendarOutcome {
        let schedule = match self.store.market_schedule() {
            Ok(Some(schedule)) => schedule,
            Ok(None) => {
                warn!("market schedule row missing");
                return CalendarOutcome::Unavailable;
            }
            Err(err) => {
                error!(error = %err, "failed to read market schedule");
                return CalendarOutcome::Unavailable;
            }
        };

        let local = now.with_timezone(&self.offset).naive_local();
        let open = schedule.should_be_open(local);
        if open == schedule.status {
            return CalendarOutcome::Unchanged { open };
        }

        if let Err(err) = self.store.set_market_status(schedule.id, open) {
            error!(error = %err, open, "failed to update market status");
            return CalendarOutcome::Unavailable;
        }

        info!(open, at = %local, "market status changed");
        self.publisher.publish(MarketEvent::market_status_changed(open));
        self.log.write(JobLogEvent::new(
            run,
            JobKind::MarketCalendar,
            JobLogEventKind::MarketStatusChanged,
        ));
        CalendarOutcome::Changed { open }
    }
}

impl<P: EventPublisher + 'static> Job for MarketCalendarJob<P> {
    fn kind(&self) -> JobKind {
        JobKind::MarketCalendar
    }

    fn run(&mut self, now: DateTime<Utc>) {
        self.run_once(now);
    }
}

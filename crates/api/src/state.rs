use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_sim::MarketEvent;
use runtime::{Clock, EventPublisher};
use store::Store;
use tokio::sync::broadcast;

pub const DEFAULT_STARTING_CASH: f64 = 10_000.0;

#[derive(Clone)]
pub struct AppState {
    store: Store,
    events_tx: broadcast::Sender<MarketEvent>,
    clock: Arc<dyn Clock>,
    starting_cash: f64,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("starting_cash", &self.starting_cash)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        store: Store,
        events_tx: broadcast::Sender<MarketEvent>,
        clock: Arc<dyn Clock>,
        starting_cash: f64,
    ) -> Self {
        Self {
            store,
            events_tx,
            clock,
            starting_cash,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MarketEvent> {
        self.events_tx.subscribe()
    }

    pub fn publish_event(&self, event: MarketEvent) -> usize {
        self.events_tx.publish(event)
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        use chrono::TimeZone;

        let clock = runtime::ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap());
        Self::new(
            Store::open_in_memory().unwrap(),
            runtime::event_channel(64),
            Arc::new(clock),
            DEFAULT_STARTING_CASH,
        )
    }
}

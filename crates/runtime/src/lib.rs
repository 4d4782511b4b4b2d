//! Background jobs for the trading simulator: order settlement, the price
//! walk and the market calendar, plus the scheduler that drives them.

pub mod clock;
pub mod events;
pub mod logging;
pub mod market;
pub mod metrics;
pub mod price_sim;
pub mod scheduler;
pub mod settlement;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{event_channel, EventPublisher};
pub use market::{CalendarOutcome, MarketCalendarJob};
pub use price_sim::{PriceRunReport, PriceSimulator};
pub use scheduler::{Job, JobScheduler, TaskId, TaskLifecycle};
pub use settlement::{SettlementConfig, SettlementJob, SettlementReport};

/// Default interval between settlement runs.
pub const SETTLEMENT_INTERVAL_SECS: u64 = 15;
/// Default interval between price simulation and calendar runs.
pub const PRICE_INTERVAL_SECS: u64 = 30;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, FixedOffset, TimeZone, Utc};
    use core_sim::{NewOrder, OrderSide, OrderStatus, PriceWalk, SimConfig};
    use store::Store;

    use crate::{
        event_channel,
        logging::JobKind,
        metrics::JobMetrics,
        MarketCalendarJob, PriceSimulator, SettlementConfig, SettlementJob,
    };

    #[test]
    fn jobs_share_one_metrics_sink() {
        let store = Store::open_in_memory().unwrap();
        let tx = event_channel(16);
        let metrics = Arc::new(JobMetrics::new());
        let offset = FixedOffset::east_opt(0).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();

        let mut settlement =
            SettlementJob::new(store.clone(), tx.clone(), SettlementConfig::default(), metrics.clone());
        let mut prices = PriceSimulator::new(
            store.clone(),
            tx.clone(),
            PriceWalk::seeded(1, SimConfig::default()),
            offset,
            metrics.clone(),
        );
        let mut calendar = MarketCalendarJob::new(store.clone(), tx, offset, metrics.clone());

        let order = store
            .insert_order(
                &NewOrder {
                    user_id: 1,
                    stock_id: 1,
                    side: OrderSide::Buy,
                    quantity: 1,
                    price: 5.0,
                },
                t0,
            )
            .unwrap();
        settlement.run_once(t0 + Duration::seconds(60));
        prices.run_once(t0);
        calendar.run_once(t0);

        assert_eq!(
            store.get_order(order.id).unwrap().unwrap().status,
            OrderStatus::Executed
        );
        assert_eq!(metrics.snapshot(JobKind::Settlement).executed, 1);
        assert_eq!(metrics.snapshot(JobKind::PriceSimulation).runs, 1);
        assert_eq!(metrics.snapshot(JobKind::MarketCalendar).status_changes, 1);
    }
}

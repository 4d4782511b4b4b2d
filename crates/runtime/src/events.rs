use core_sim::MarketEvent;
use tokio::sync::broadcast;

/// Fan-out seam between the jobs and whatever delivers events to viewers.
pub trait EventPublisher: Send + Sync {
    /// Returns how many receivers got the event.
    fn publish(&self, event: MarketEvent) -> usize;
}

/// Having no subscribers is not an error: nobody is watching.
impl EventPublisher for broadcast::Sender<MarketEvent> {
    fn publish(&self, event: MarketEvent) -> usize {
        self.send(event).unwrap_or(0)
    }
}

pub fn event_channel(capacity: usize) -> broadcast::Sender<MarketEvent> {
    let (tx, _) = broadcast::channel(capacity);
    tx
}

#[cfg(test)]
mod tests {
    use core_sim::MarketEvent;

    use super::{event_channel, EventPublisher};

    #[test]
    fn publish_without_subscribers_reaches_nobody() {
        let tx = event_channel(4);

        assert_eq!(tx.publish(MarketEvent::Connected), 0);
    }

    #[test]
    fn publish_reaches_each_subscriber() {
        let tx = event_channel(4);
        let mut first = tx.subscribe();
        let mut second = tx.subscribe();

        assert_eq!(tx.publish(MarketEvent::market_status_changed(true)), 2);
        assert_eq!(
            first.try_recv().unwrap(),
            MarketEvent::market_status_changed(true)
        );
        assert!(second.try_recv().is_ok());
    }
}

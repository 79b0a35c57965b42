//! "Latest rates updated" notifications.
//!
//! Every subscriber owns an unbounded queue, so a slow consumer falls behind
//! but never loses an event. A replayed refresh publishes the same ids again,
//! which makes delivery at-least-once; consumers must tolerate duplicates.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;

use rates_types::{CacheEntryId, CurrencyCode, TrailId};

/// Published once per `refresh` or promoting `create_or_update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestRatesUpdated {
    pub trail_id: TrailId,
    /// Currencies whose latest entry moved.
    pub currencies: Vec<CurrencyCode>,
    pub affected_ids: Vec<CacheEntryId>,
    pub published_at: DateTime<Utc>,
}

/// Fans events out to one queue per subscriber.
#[derive(Clone, Default)]
pub struct EventPublisher {
    subscribers: Arc<DashMap<u64, mpsc::UnboundedSender<LatestRatesUpdated>>>,
    next_id: Arc<AtomicU64>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber; it receives every event published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LatestRatesUpdated> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns how many subscribers received the event.
    ///
    /// Subscribers whose receiver was dropped are removed.
    pub fn publish(&self, event: LatestRatesUpdated) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|_, tx| {
            let open = tx.send(event.clone()).is_ok();
            if open {
                delivered += 1;
            }
            open
        });
        if delivered == 0 {
            tracing::debug!("No subscribers for latest-rates event");
        }
        delivered
    }
}

/// Logs every event until the publisher side is gone.
pub async fn log_events(mut rx: mpsc::UnboundedReceiver<LatestRatesUpdated>) {
    while let Some(event) = rx.recv().await {
        tracing::info!(
            trail_id = %event.trail_id,
            currencies = ?event.currencies,
            "Latest rates updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> LatestRatesUpdated {
        LatestRatesUpdated {
            trail_id: TrailId::new(),
            currencies: vec![CurrencyCode::EUR],
            affected_ids: vec![],
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let publisher = EventPublisher::default();
        let mut a = publisher.subscribe();
        let mut b = publisher.subscribe();

        let sent = event();
        assert_eq!(publisher.publish(sent.clone()), 2);
        assert_eq!(a.recv().await.unwrap(), sent);
        assert_eq!(b.recv().await.unwrap(), sent);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = EventPublisher::default();
        assert_eq!(publisher.publish(event()), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_receives_every_event() {
        let publisher = EventPublisher::new();
        let mut slow = publisher.subscribe();

        let sent: Vec<_> = (0..200).map(|_| event()).collect();
        for e in &sent {
            assert_eq!(publisher.publish(e.clone()), 1);
        }

        let mut received = Vec::new();
        while let Ok(e) = slow.try_recv() {
            received.push(e);
        }
        assert_eq!(received, sent);
    }

    #[test]
    fn test_dropped_subscriber_is_removed() {
        let publisher = EventPublisher::new();
        let kept = publisher.subscribe();
        drop(publisher.subscribe());

        assert_eq!(publisher.publish(event()), 1);
        assert_eq!(publisher.subscriber_count(), 1);
        drop(kept);
    }
}

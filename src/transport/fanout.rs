//! Topic-keyed pub/sub fan-out over a resilient connection, generalizing the
//! teacher's `Streams<T>` (an `ExchangeId`-keyed collection of receivers) to
//! arbitrary topic keys with re-subscribe-on-reconnect behaviour.

use std::sync::Arc;

use parking_lot::Mutex;
use smol_str::SmolStr;
use tokio::sync::mpsc;

use crate::collection::FnvIndexMap;
use crate::error::XchangeError;

pub type Topic = SmolStr;

/// Re-issues whatever subscribe message `topic` requires; called once per
/// topic on registration and again after every reconnect.
pub type SubscribeFn = Arc<dyn Fn(&Topic) + Send + Sync>;

/// A registry of topic -> subscriber channels, fed by a single upstream
/// dispatch point (typically a [`super::resilient_socket::ResilientWebSocket`]
/// message callback that has already been decoded and topic-tagged).
pub struct Fanout<E> {
    subscribers: Mutex<FnvIndexMap<Topic, Vec<mpsc::Sender<E>>>>,
    subscribe_fn: SubscribeFn,
}

impl<E: Clone> Fanout<E> {
    pub fn new(subscribe_fn: SubscribeFn) -> Self {
        Self {
            subscribers: Mutex::new(FnvIndexMap::default()),
            subscribe_fn,
        }
    }

    /// Registers a new subscriber for `topic`, issuing the subscribe message
    /// if this is the topic's first subscriber.
    pub fn subscribe(&self, topic: impl Into<Topic>, capacity: usize) -> mpsc::Receiver<E> {
        let topic = topic.into();
        let (tx, rx) = mpsc::channel(capacity);
        let mut subscribers = self.subscribers.lock();
        let is_first = !subscribers.contains_key(&topic) || subscribers[&topic].is_empty();
        subscribers.entry(topic.clone()).or_default().push(tx);
        drop(subscribers);
        if is_first {
            (self.subscribe_fn)(&topic);
        }
        rx
    }

    /// Drops subscribers whose receiver has gone away, keeping the registry
    /// from growing unboundedly across long-lived connections.
    pub fn prune_closed(&self) {
        let mut subscribers = self.subscribers.lock();
        for senders in subscribers.values_mut() {
            senders.retain(|tx| !tx.is_closed());
        }
        subscribers.retain(|_, senders| !senders.is_empty());
    }

    /// Delivers `event` to every live subscriber of `topic`.
    pub async fn publish(&self, topic: &Topic, event: E) -> Result<(), XchangeError> {
        let senders = {
            let subscribers = self.subscribers.lock();
            subscribers.get(topic).cloned().unwrap_or_default()
        };
        if senders.is_empty() {
            return Ok(());
        }
        for tx in senders {
            let _ = tx.send(event.clone()).await;
        }
        Ok(())
    }

    /// Re-issues a subscribe message for every topic with at least one live
    /// subscriber. Called after a reconnect so the exchange re-learns which
    /// streams this connection wants.
    pub fn resubscribe_all(&self) {
        self.prune_closed();
        let topics: Vec<Topic> = self.subscribers.lock().keys().cloned().collect();
        for topic in &topics {
            (self.subscribe_fn)(topic);
        }
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.subscribers.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn first_subscriber_triggers_subscribe_and_later_ones_do_not() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let fanout: Fanout<i32> = Fanout::new(Arc::new(move |_topic| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let mut rx1 = fanout.subscribe("trades.BTC-USD", 4);
        let mut rx2 = fanout.subscribe("trades.BTC-USD", 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        fanout.publish(&"trades.BTC-USD".into(), 42).await.unwrap();
        assert_eq!(rx1.recv().await, Some(42));
        assert_eq!(rx2.recv().await, Some(42));
    }

    #[tokio::test]
    async fn resubscribe_all_reissues_for_every_live_topic() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let fanout: Fanout<i32> = Fanout::new(Arc::new(move |_topic| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        let _rx_a = fanout.subscribe("a", 1);
        let _rx_b = fanout.subscribe("b", 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        fanout.resubscribe_all();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn prune_closed_drops_dead_subscribers() {
        let fanout: Fanout<i32> = Fanout::new(Arc::new(|_| {}));
        let rx = fanout.subscribe("a", 1);
        drop(rx);
        fanout.prune_closed();
        assert!(fanout.topics().is_empty());
    }
}

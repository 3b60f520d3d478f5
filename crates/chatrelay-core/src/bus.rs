//! Publish/subscribe event bus seam

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc};

/// Default buffer for bus subscriptions
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// One logical channel that every instance publishes to and subscribes on
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a serialized envelope. Resolves once the bus accepted it.
    async fn publish(&self, payload: &str) -> Result<()>;

    /// Start receiving every payload published on the channel
    async fn subscribe(&self) -> Result<BusSubscription>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

/// Stream of raw payloads delivered by a bus
pub struct BusSubscription {
    receiver: mpsc::Receiver<String>,
}

impl BusSubscription {
    /// Create a subscription and the sender its backend feeds
    pub fn channel(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { receiver: rx })
    }

    /// Next payload, or `None` once the backend stopped delivering
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

/// In-process bus for single-instance deployments and tests
pub struct LocalBus {
    sender: broadcast::Sender<String>,
    unavailable: AtomicBool,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Make publishes fail as if the bus were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[async_trait]
impl EventBus for LocalBus {
    async fn publish(&self, payload: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::bus("local bus marked unavailable"));
        }
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(payload.to_string());
        Ok(())
    }

    async fn subscribe(&self) -> Result<BusSubscription> {
        let mut events = self.sender.subscribe();
        let (tx, subscription) = BusSubscription::channel(DEFAULT_BUS_CAPACITY);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Local bus subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(subscription)
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_subscriber_sees_every_publish() {
        let bus = LocalBus::default();
        let mut first = bus.subscribe().await.unwrap();
        let mut second = bus.subscribe().await.unwrap();

        bus.publish("one").await.unwrap();
        bus.publish("two").await.unwrap();

        for sub in [&mut first, &mut second] {
            let a = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await.unwrap();
            let b = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await.unwrap();
            assert_eq!(a.as_deref(), Some("one"));
            assert_eq!(b.as_deref(), Some("two"));
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = LocalBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish("nobody listens").await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_bus_rejects_publish() {
        let bus = LocalBus::default();
        bus.set_unavailable(true);
        assert!(matches!(bus.publish("x").await, Err(Error::Bus(_))));
    }
}

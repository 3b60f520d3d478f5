use crate::backoff::Backoff;
use async_trait::async_trait;
use chatrelay_core::bus::DEFAULT_BUS_CAPACITY;
use chatrelay_core::{BusSubscription, Error, EventBus, Result};
use futures_util::StreamExt;
use redis::aio::{ConnectionManager, PubSub};
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Event bus over one Redis Pub/Sub channel.
///
/// Publishing goes through a shared connection manager. Each subscription
/// opens its own dedicated Pub/Sub connection, as Redis requires, and
/// resubscribes with backoff whenever that connection drops. Payloads
/// published while it is down are lost.
pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
    channel: String,
}

impl RedisBus {
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self> {
        let client = crate::open_client(url)?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| Error::bus(e.to_string()))?;
        let channel = channel.into();
        info!(
            "Connected event bus to {} on channel {}",
            crate::server_addr(&client),
            channel
        );

        Ok(Self {
            client,
            publisher,
            channel,
        })
    }
}

async fn open_pubsub(client: &redis::Client, channel: &str) -> Result<PubSub> {
    let mut pubsub = client
        .get_async_pubsub()
        .await
        .map_err(|e| Error::bus(e.to_string()))?;
    pubsub
        .subscribe(channel)
        .await
        .map_err(|e| Error::bus(e.to_string()))?;
    Ok(pubsub)
}

/// Forward payloads until the subscriber goes away, reopening the Pub/Sub
/// connection each time the server ends the stream.
async fn forward(
    client: redis::Client,
    channel: String,
    mut pubsub: PubSub,
    tx: mpsc::Sender<String>,
) {
    let mut backoff = Backoff::new();

    loop {
        {
            let mut messages = pubsub.on_message();
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Dropping undecodable bus payload on {}: {}", channel, e);
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    debug!("Bus subscriber gone, stopping forwarder for {}", channel);
                    return;
                }
            }
        }

        warn!("Redis Pub/Sub stream for {} ended, resubscribing", channel);
        pubsub = loop {
            let delay = backoff.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = tx.closed() => {
                    debug!("Bus subscriber gone while reconnecting to {}", channel);
                    return;
                }
            }

            match open_pubsub(&client, &channel).await {
                Ok(pubsub) => {
                    info!(
                        attempts = backoff.attempts(),
                        "Resubscribed to Redis channel {}", channel
                    );
                    backoff.reset();
                    break pubsub;
                }
                Err(e) => warn!(
                    attempts = backoff.attempts(),
                    "Resubscribe to {} failed: {}", channel, e
                ),
            }
        };
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, payload: &str) -> Result<()> {
        let mut conn = self.publisher.clone();
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| Error::bus(e.to_string()))?;
        debug!(receivers, "Published relay event");
        Ok(())
    }

    async fn subscribe(&self) -> Result<BusSubscription> {
        let pubsub = open_pubsub(&self.client, &self.channel).await?;
        let (tx, subscription) = BusSubscription::channel(DEFAULT_BUS_CAPACITY);

        tokio::spawn(forward(
            self.client.clone(),
            self.channel.clone(),
            pubsub,
            tx,
        ));

        Ok(subscription)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

//! Cross-instance event relay
//!
//! Local intent is published on the bus; every instance, the origin
//! included, applies what it receives:
//! - `chat-message`: the origin alone appends to history, then every
//!   instance fans the entry out to its own members of the room
//! - `rooms-update`: instances other than the origin push a fresh listing

use crate::models::ServerEvent;
use crate::rooms::{HistoryStore, RoomDirectory};
use crate::transport::Hub;
use chatrelay_core::{EventBus, HistoryEntry, InstanceId, RelayEvent, RelayEventKind, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

pub struct EventRelay {
    instance_id: InstanceId,
    bus: Arc<dyn EventBus>,
    directory: Arc<RoomDirectory>,
    history: Arc<HistoryStore>,
    hub: Arc<Hub>,
}

impl EventRelay {
    pub fn new(
        instance_id: InstanceId,
        bus: Arc<dyn EventBus>,
        directory: Arc<RoomDirectory>,
        history: Arc<HistoryStore>,
        hub: Arc<Hub>,
    ) -> Self {
        Self {
            instance_id,
            bus,
            directory,
            history,
            hub,
        }
    }

    /// Subscribe to the bus and apply every event until the bus stops
    pub async fn start(self: Arc<Self>) -> Result<JoinHandle<()>> {
        let mut subscription = self.bus.subscribe().await?;
        info!(
            instance = %self.instance_id,
            backend = self.bus.backend(),
            "Event relay subscribed"
        );

        Ok(tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                self.on_receive(&payload).await;
            }
            warn!(instance = %self.instance_id, "Event relay subscription closed");
        }))
    }

    /// Wrap `payload` in an envelope and publish it. Failures are logged
    /// and not retried; returns whether the bus accepted the event.
    pub async fn publish(&self, kind: RelayEventKind, payload: serde_json::Value) -> bool {
        let event = RelayEvent::new(kind, payload, self.instance_id.clone());
        let encoded = match serde_json::to_string(&event) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to serialize relay event: {}", e);
                return false;
            }
        };

        match self.bus.publish(&encoded).await {
            Ok(()) => {
                metrics::counter!("chatrelay_relay_events_total", "direction" => "out")
                    .increment(1);
                true
            }
            Err(e) => {
                error!(kind = ?kind, "Relay publish failed, event lost: {}", e);
                metrics::counter!("chatrelay_relay_dropped_total", "reason" => "publish")
                    .increment(1);
                false
            }
        }
    }

    /// Publish a room-scoped history entry
    pub async fn publish_entry(&self, entry: &HistoryEntry) -> bool {
        match serde_json::to_value(entry) {
            Ok(payload) => self.publish(RelayEventKind::ChatMessage, payload).await,
            Err(e) => {
                error!("Failed to serialize history entry: {}", e);
                false
            }
        }
    }

    /// Tell other instances the directory changed
    pub async fn publish_rooms_update(&self, room: Option<&str>) -> bool {
        self.publish(RelayEventKind::RoomsUpdate, serde_json::json!({ "room": room }))
            .await
    }

    /// Apply one raw bus payload. Malformed payloads are dropped.
    pub async fn on_receive(&self, payload: &str) {
        let event: RelayEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed relay payload: {}", e);
                metrics::counter!("chatrelay_relay_dropped_total", "reason" => "malformed")
                    .increment(1);
                return;
            }
        };
        metrics::counter!("chatrelay_relay_events_total", "direction" => "in").increment(1);

        let local = event.is_from(&self.instance_id);
        trace!(kind = ?event.kind, origin = %event.origin_instance_id, local, "Relay event received");

        match event.kind {
            RelayEventKind::ChatMessage => {
                let entry = match event.history_entry() {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Dropping chat-message with bad payload: {}", e);
                        metrics::counter!("chatrelay_relay_dropped_total", "reason" => "malformed")
                            .increment(1);
                        return;
                    }
                };

                if local {
                    self.history.append(&entry).await;
                }

                let room = entry.room().to_string();
                let delivered = self.hub.to_room(&room, &ServerEvent::from_entry(entry));
                debug!(room = %room, delivered, "Relayed entry to local members");
            }
            RelayEventKind::RoomsUpdate => {
                if local {
                    return;
                }
                let rooms = self.directory.snapshot().await;
                self.hub.to_all(&ServerEvent::RoomList(rooms));
            }
        }
    }
}

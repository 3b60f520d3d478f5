//! Core types for chatrelay

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on stored history entries per room
pub const MAX_HISTORY: usize = 50;

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Trim a user-supplied name, rejecting blank input.
///
/// Room names and usernames are opaque and case-sensitive; only surrounding
/// whitespace is removed.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Process-lifetime identifier of a service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Generate a fresh random instance id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single entry of a room's history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HistoryEntry {
    /// System notice such as joins and departures
    Info {
        room: String,
        message: String,
        timestamp: i64,
    },

    /// A message typed by a user
    Chat {
        room: String,
        username: String,
        message: String,
        timestamp: i64,
    },
}

impl HistoryEntry {
    /// Create an info entry stamped with the current time
    pub fn info(room: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Info {
            room: room.into(),
            message: message.into(),
            timestamp: now_millis(),
        }
    }

    /// Create a chat entry stamped with the current time
    pub fn chat(
        room: impl Into<String>,
        username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Chat {
            room: room.into(),
            username: username.into(),
            message: message.into(),
            timestamp: now_millis(),
        }
    }

    pub fn room(&self) -> &str {
        match self {
            Self::Info { room, .. } | Self::Chat { room, .. } => room,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Info { message, .. } | Self::Chat { message, .. } => message,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Info { timestamp, .. } | Self::Chat { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Chat { .. })
    }
}

/// One row of the room listing pushed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    pub users: u64,
}

/// Kind of a relay event travelling on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayEventKind {
    /// Payload is a [`HistoryEntry`] to fan out to a room
    ChatMessage,
    /// Room directory changed; listeners should refresh their listing
    RoomsUpdate,
}

/// Envelope carried on the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEvent {
    #[serde(rename = "type")]
    pub kind: RelayEventKind,

    pub payload: serde_json::Value,

    /// Instance that produced the event
    pub origin_instance_id: InstanceId,

    /// Epoch milliseconds at publish time
    pub timestamp: i64,
}

impl RelayEvent {
    /// Wrap a payload with origin and timestamp
    pub fn new(kind: RelayEventKind, payload: serde_json::Value, origin: InstanceId) -> Self {
        Self {
            kind,
            payload,
            origin_instance_id: origin,
            timestamp: now_millis(),
        }
    }

    /// Whether this event was produced by `instance`
    pub fn is_from(&self, instance: &InstanceId) -> bool {
        &self.origin_instance_id == instance
    }

    /// Decode the payload of a `chat-message` event
    pub fn history_entry(&self) -> crate::Result<HistoryEntry> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

//! Client-facing event surface carried over the WebSocket

use chatrelay_core::{HistoryEntry, RoomSummary};
use serde::{Deserialize, Serialize};

/// Requests a client may send, framed as `{"event": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientRequest {
    #[serde(rename = "join room")]
    JoinRoom(JoinRoomRequest),

    #[serde(rename = "create room")]
    CreateRoom(CreateRoomRequest),

    #[serde(rename = "chat message")]
    ChatMessage(ChatMessageRequest),

    #[serde(rename = "leave room")]
    LeaveRoom,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub room: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatMessageRequest {
    /// Ignored for attribution; the session username is authoritative
    #[serde(default)]
    pub username: Option<String>,
    /// When present must name the room the session is in
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Events the server pushes to a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "room joined")]
    RoomJoined { room: String, username: String },

    #[serde(rename = "room history")]
    RoomHistory {
        room: String,
        messages: Vec<HistoryEntry>,
    },

    /// Info notice fanned out to room members
    #[serde(rename = "room message")]
    RoomMessage(HistoryEntry),

    #[serde(rename = "chat message")]
    ChatMessage(HistoryEntry),

    #[serde(rename = "room left")]
    RoomLeft { room: String },

    #[serde(rename = "room list")]
    RoomList(Vec<RoomSummary>),

    #[serde(rename = "room error")]
    RoomError { message: String },
}

impl ServerEvent {
    /// Wrap a history entry in the event matching its kind
    pub fn from_entry(entry: HistoryEntry) -> Self {
        if entry.is_chat() {
            Self::ChatMessage(entry)
        } else {
            Self::RoomMessage(entry)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::RoomError {
            message: message.into(),
        }
    }
}

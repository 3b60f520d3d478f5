//! Per-connection request handlers
//!
//! Each handler validates input, mutates the room directory and drives the
//! relay. Handlers only touch the session they are given; sessions are never
//! shared between connections.

use crate::error::{ChatError, ChatResult};
use crate::models::{ChatMessageRequest, ClientRequest, CreateRoomRequest, JoinRoomRequest, ServerEvent};
use crate::relay::EventRelay;
use crate::rooms::{HistoryStore, RoomDirectory};
use crate::session::Session;
use crate::transport::{ConnectionId, Hub};
use chatrelay_core::{normalize_name, HistoryEntry};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Coordinator {
    directory: Arc<RoomDirectory>,
    history: Arc<HistoryStore>,
    relay: Arc<EventRelay>,
    hub: Arc<Hub>,
}

impl Coordinator {
    pub fn new(
        directory: Arc<RoomDirectory>,
        history: Arc<HistoryStore>,
        relay: Arc<EventRelay>,
        hub: Arc<Hub>,
    ) -> Self {
        Self {
            directory,
            history,
            relay,
            hub,
        }
    }

    /// Initial snapshot for a fresh connection
    pub async fn on_connect(&self, conn: ConnectionId) {
        let rooms = self.directory.snapshot().await;
        self.hub.send_to(conn, ServerEvent::RoomList(rooms));
    }

    /// Dispatch one request; failures go back to the requester only
    pub async fn handle(&self, conn: ConnectionId, session: &mut Session, request: ClientRequest) {
        let result = match request {
            ClientRequest::JoinRoom(req) => self.join(conn, session, req).await,
            ClientRequest::CreateRoom(req) => self.create_room(req).await,
            ClientRequest::ChatMessage(req) => self.send_chat(conn, session, req).await,
            ClientRequest::LeaveRoom => {
                self.leave(conn, session).await;
                Ok(())
            }
        };

        if let Err(e) = result {
            match &e {
                ChatError::Validation(msg) => debug!(conn, "Rejected request: {}", msg),
                ChatError::Unavailable(err) => warn!(conn, "Request failed: {}", err),
            }
            self.hub.send_to(conn, ServerEvent::error(e.client_message()));
        }
    }

    pub async fn join(&self, conn: ConnectionId, session: &mut Session, req: JoinRoomRequest) -> ChatResult<()> {
        let username = normalize_name(&req.username)
            .ok_or_else(|| ChatError::validation("Username is required"))?;
        let room = normalize_name(&req.room)
            .ok_or_else(|| ChatError::validation("Room name is required"))?;

        if session.room() == Some(room.as_str()) {
            session.set_username(username.clone());
            self.hub.join_group(conn, &room);
            self.send_joined(conn, &room, &username).await;
            return Ok(());
        }

        // The old room hears about the departure under the name it knew
        if session.room().is_some() {
            self.leave(conn, session).await;
        }
        session.set_username(username.clone());

        match self.directory.create_if_absent(&room).await {
            Ok(true) => info!(room = %room, "Room created on first join"),
            Ok(false) => {}
            Err(e) => warn!(room = %room, "Room registration failed: {}", e),
        }
        if let Err(e) = self.directory.increment_membership(&room).await {
            warn!(room = %room, "Membership increment failed: {}", e);
        }

        self.hub.join_group(conn, &room);
        session.enter_room(room.clone());
        self.send_joined(conn, &room, &username).await;

        self.relay
            .publish_entry(&HistoryEntry::info(&room, format!("{username} joined {room}.")))
            .await;
        self.refresh_rooms(Some(&room)).await;

        metrics::counter!("chatrelay_joins_total").increment(1);
        info!(conn, username = %username, room = %room, "Joined room");
        Ok(())
    }

    /// Leave the current room. A no-op when not in one.
    pub async fn leave(&self, conn: ConnectionId, session: &mut Session) {
        let Some(room) = session.leave_room() else {
            return;
        };

        self.hub.leave_group(conn, &room);
        if let Err(e) = self.directory.decrement_membership(&room).await {
            warn!(room = %room, "Membership decrement failed: {}", e);
        }
        self.hub.send_to(conn, ServerEvent::RoomLeft { room: room.clone() });

        if let Some(username) = session.username() {
            self.relay
                .publish_entry(&HistoryEntry::info(&room, format!("{username} left {room}.")))
                .await;
            info!(conn, username, room = %room, "Left room");
        }
        self.refresh_rooms(Some(&room)).await;
    }

    /// Register an empty room without joining it
    pub async fn create_room(&self, req: CreateRoomRequest) -> ChatResult<()> {
        let room = normalize_name(&req.room)
            .ok_or_else(|| ChatError::validation("Room name is required"))?;

        if !self.directory.create_if_absent(&room).await? {
            return Err(ChatError::validation(format!("Room \"{room}\" already exists")));
        }

        info!(room = %room, "Room created");
        self.refresh_rooms(Some(&room)).await;
        Ok(())
    }

    pub async fn send_chat(&self, conn: ConnectionId, session: &Session, req: ChatMessageRequest) -> ChatResult<()> {
        let (Some(username), Some(room)) = (session.username(), session.room()) else {
            return Err(ChatError::validation("Join a room before sending messages"));
        };

        if let Some(requested) = req.room.as_deref().and_then(normalize_name) {
            if requested != room {
                return Err(ChatError::validation(format!(
                    "You are not a member of room \"{requested}\""
                )));
            }
        }

        let message = normalize_name(&req.message)
            .ok_or_else(|| ChatError::validation("Message cannot be empty"))?;

        if !self.hub.is_member(conn, room) {
            return Err(ChatError::validation(format!(
                "You are not a member of room \"{room}\""
            )));
        }

        self.relay
            .publish_entry(&HistoryEntry::chat(room, username, message))
            .await;
        metrics::counter!("chatrelay_messages_total").increment(1);
        Ok(())
    }

    /// Connection closed: leave the room if any and drop the connection
    pub async fn disconnect(&self, conn: ConnectionId, session: &mut Session) {
        self.leave(conn, session).await;
        self.hub.unregister(conn);
        debug!(conn, "Connection closed");
    }

    async fn send_joined(&self, conn: ConnectionId, room: &str, username: &str) {
        let messages = self.history.fetch(room).await;
        self.hub.send_to(
            conn,
            ServerEvent::RoomJoined {
                room: room.to_string(),
                username: username.to_string(),
            },
        );
        self.hub.send_to(
            conn,
            ServerEvent::RoomHistory {
                room: room.to_string(),
                messages,
            },
        );
    }

    /// Push the listing to local clients and tell other instances to do the same
    async fn refresh_rooms(&self, room: Option<&str>) {
        let rooms = self.directory.snapshot().await;
        self.hub.to_all(&ServerEvent::RoomList(rooms));
        self.relay.publish_rooms_update(room).await;
    }
}

/// Lifecycle stage of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No username, no room
    Unbound,
    /// Username known, not in a room
    Named,
    /// Username known and member of a room
    InRoom,
}

/// Per-connection state, owned by the connection's handler task
#[derive(Debug, Default)]
pub struct Session {
    username: Option<String>,
    room: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match (&self.username, &self.room) {
            (Some(_), Some(_)) => SessionState::InRoom,
            (Some(_), None) => SessionState::Named,
            (None, _) => SessionState::Unbound,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Set or replace the username, keeping any room membership
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    /// Record membership of `room`; only valid once a username is set
    pub fn enter_room(&mut self, room: impl Into<String>) -> bool {
        if self.username.is_none() {
            return false;
        }
        self.room = Some(room.into());
        true
    }

    /// Clear room membership, returning the room that was left
    pub fn leave_room(&mut self) -> Option<String> {
        self.room.take()
    }
}

use crate::models::ServerEvent;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// Identifier of a locally connected client
pub type ConnectionId = u64;

/// Outbound events for one connection
pub type Outbound = mpsc::Receiver<ServerEvent>;

/// Default per-connection outbound queue length
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Locally connected clients and their room-scoped multicast groups.
///
/// Only this instance's connections are known here; cross-instance fan-out
/// goes through the relay. Each connection's queue is bounded: events for a
/// connection that is not draining its queue are dropped.
pub struct Hub {
    next_id: AtomicU64,
    capacity: usize,
    inner: RwLock<HubInner>,
}

#[derive(Default)]
struct HubInner {
    connections: HashMap<ConnectionId, Connection>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

struct Connection {
    sender: mpsc::Sender<ServerEvent>,
    rooms: HashSet<String>,
}

impl Connection {
    /// Queue without waiting. A full queue drops the event; a closed one is
    /// ignored since its reader is about to unregister.
    fn deliver(&self, id: ConnectionId, event: ServerEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(conn = id, "Outbound queue full, dropping event");
                metrics::counter!("chatrelay_outbound_dropped_total").increment(1);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Hub whose connections each buffer at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            inner: RwLock::new(HubInner::default()),
        }
    }

    /// Register a new connection and hand back its outbound queue
    pub fn register(&self) -> (ConnectionId, Outbound) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.inner.write().connections.insert(
            id,
            Connection {
                sender,
                rooms: HashSet::new(),
            },
        );
        (id, receiver)
    }

    /// Forget a connection and every group it belonged to
    pub fn unregister(&self, id: ConnectionId) {
        let mut inner = self.inner.write();
        if let Some(conn) = inner.connections.remove(&id) {
            for room in conn.rooms {
                remove_from_group(&mut inner.groups, &room, id);
            }
        }
    }

    pub fn join_group(&self, id: ConnectionId, room: &str) {
        let mut inner = self.inner.write();
        let Some(conn) = inner.connections.get_mut(&id) else {
            return;
        };
        conn.rooms.insert(room.to_string());
        inner.groups.entry(room.to_string()).or_default().insert(id);
    }

    pub fn leave_group(&self, id: ConnectionId, room: &str) {
        let mut inner = self.inner.write();
        if let Some(conn) = inner.connections.get_mut(&id) {
            conn.rooms.remove(room);
        }
        remove_from_group(&mut inner.groups, room, id);
    }

    pub fn is_member(&self, id: ConnectionId, room: &str) -> bool {
        self.inner
            .read()
            .groups
            .get(room)
            .is_some_and(|members| members.contains(&id))
    }

    /// Send to one connection; dropped if it is gone or not keeping up
    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) {
        if let Some(conn) = self.inner.read().connections.get(&id) {
            conn.deliver(id, event);
        }
    }

    /// Send to every local member of `room`
    pub fn to_room(&self, room: &str, event: &ServerEvent) -> usize {
        let inner = self.inner.read();
        let Some(members) = inner.groups.get(room) else {
            return 0;
        };
        members
            .iter()
            .filter_map(|id| inner.connections.get(id).map(|conn| (*id, conn)))
            .filter(|(id, conn)| conn.deliver(*id, event.clone()))
            .count()
    }

    /// Send to every local connection
    pub fn to_all(&self, event: &ServerEvent) -> usize {
        self.inner
            .read()
            .connections
            .iter()
            .filter(|(id, conn)| conn.deliver(**id, event.clone()))
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }

    /// Local members of `room`
    pub fn room_size(&self, room: &str) -> usize {
        self.inner.read().groups.get(room).map_or(0, HashSet::len)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_from_group(groups: &mut HashMap<String, HashSet<ConnectionId>>, room: &str, id: ConnectionId) {
    if let Some(members) = groups.get_mut(room) {
        members.remove(&id);
        if members.is_empty() {
            groups.remove(room);
        }
    }
}

//! chatrelay core
//!
//! Types and seams shared by every chatrelay component.
//!
//! This crate provides:
//! - History entries, relay envelopes and room listing rows
//! - Error types and result handling
//! - The `CoordinationStore` and `EventBus` traits with in-process backends

pub mod bus;
pub mod error;
pub mod store;
pub mod types;

pub use bus::{BusSubscription, EventBus, LocalBus};
pub use error::{Error, Result};
pub use store::{CoordinationStore, MemoryStore};
pub use types::{
    normalize_name, now_millis, HistoryEntry, InstanceId, RelayEvent, RelayEventKind,
    RoomSummary, MAX_HISTORY,
};

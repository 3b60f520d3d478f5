use chatrelay_core::{CoordinationStore, HistoryEntry};
use std::sync::Arc;
use tracing::warn;

/// Bounded per-room message log.
///
/// History is an amenity: store faults are logged and read as empty, never
/// surfaced to callers.
pub struct HistoryStore {
    store: Arc<dyn CoordinationStore>,
    key_prefix: String,
    max_history: usize,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn CoordinationStore>, key_prefix: &str, max_history: usize) -> Self {
        Self {
            store,
            key_prefix: key_prefix.to_string(),
            max_history,
        }
    }

    fn key(&self, room: &str) -> String {
        format!("{}:history:{}", self.key_prefix, room)
    }

    /// Append to the room's log, then evict the oldest entries beyond the cap
    pub async fn append(&self, entry: &HistoryEntry) {
        let key = self.key(entry.room());
        let encoded = match serde_json::to_string(entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to serialize history entry: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.list_push(&key, &encoded).await {
            warn!(room = entry.room(), "History append failed: {}", e);
            metrics::counter!("chatrelay_store_errors_total", "op" => "history_append").increment(1);
            return;
        }
        if let Err(e) = self.store.list_trim_to_last(&key, self.max_history).await {
            warn!(room = entry.room(), "History trim failed: {}", e);
            metrics::counter!("chatrelay_store_errors_total", "op" => "history_trim").increment(1);
        }
    }

    /// Up to `max_history` most recent entries, oldest first
    pub async fn fetch(&self, room: &str) -> Vec<HistoryEntry> {
        let raw = match self.store.list_range_all(&self.key(room)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(room, "History fetch failed: {}", e);
                metrics::counter!("chatrelay_store_errors_total", "op" => "history_fetch")
                    .increment(1);
                return Vec::new();
            }
        };

        // A concurrent writer may have pushed before trimming
        let skip = raw.len().saturating_sub(self.max_history);
        raw.iter()
            .skip(skip)
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(room, "Skipping malformed history entry: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::{MemoryStore, MAX_HISTORY};

    fn history() -> (Arc<MemoryStore>, HistoryStore) {
        let store = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(store.clone(), "test", MAX_HISTORY);
        (store, history)
    }

    #[tokio::test]
    async fn test_fetch_empty_room() {
        let (_, history) = history();
        assert!(history.fetch("general").await.is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let (_, history) = history();
        history.append(&HistoryEntry::info("general", "alice joined general.")).await;
        history.append(&HistoryEntry::chat("general", "alice", "hi")).await;
        history.append(&HistoryEntry::chat("other", "bob", "elsewhere")).await;

        let entries = history.fetch("general").await;
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_chat());
        assert_eq!(entries[1].message(), "hi");
    }

    #[tokio::test]
    async fn test_trim_evicts_oldest_first() {
        let (_, history) = history();
        for i in 0..=MAX_HISTORY {
            history
                .append(&HistoryEntry::chat("general", "alice", format!("message {i}")))
                .await;
        }

        let entries = history.fetch("general").await;
        assert_eq!(entries.len(), MAX_HISTORY);
        assert_eq!(entries[0].message(), "message 1");
        assert_eq!(entries[MAX_HISTORY - 1].message(), format!("message {MAX_HISTORY}"));
    }

    #[tokio::test]
    async fn test_fetch_caps_untrimmed_list() {
        let (store, history) = history();
        for i in 0..MAX_HISTORY + 3 {
            let entry = HistoryEntry::chat("general", "alice", format!("m{i}"));
            store
                .list_push("test:history:general", &serde_json::to_string(&entry).unwrap())
                .await
                .unwrap();
        }

        let entries = history.fetch("general").await;
        assert_eq!(entries.len(), MAX_HISTORY);
        assert_eq!(entries[0].message(), "m3");
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let (store, history) = history();
        store.list_push("test:history:general", "not json").await.unwrap();
        history.append(&HistoryEntry::chat("general", "alice", "hi")).await;

        let entries = history.fetch("general").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message(), "hi");
    }

    #[tokio::test]
    async fn test_store_fault_reads_as_empty() {
        let (store, history) = history();
        history.append(&HistoryEntry::chat("general", "alice", "hi")).await;

        store.set_unavailable(true);
        history.append(&HistoryEntry::chat("general", "alice", "lost")).await;
        assert!(history.fetch("general").await.is_empty());

        store.set_unavailable(false);
        assert_eq!(history.fetch("general").await.len(), 1);
    }
}

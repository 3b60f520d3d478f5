use chatrelay_core::{CoordinationStore, Result, RoomSummary};
use icu_normalizer::properties::CanonicalCombiningClassMap;
use icu_normalizer::DecomposingNormalizer;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which rooms exist and how many members each has.
///
/// Existence lives in a set, counts in a hash. A room leaves both when its
/// count drops to zero or below.
pub struct RoomDirectory {
    store: Arc<dyn CoordinationStore>,
    rooms_key: String,
    users_key: String,
}

impl RoomDirectory {
    pub fn new(store: Arc<dyn CoordinationStore>, key_prefix: &str) -> Self {
        Self {
            store,
            rooms_key: format!("{key_prefix}:rooms"),
            users_key: format!("{key_prefix}:room-users"),
        }
    }

    /// Add `room` with zero members. Returns false when it already existed.
    pub async fn create_if_absent(&self, room: &str) -> Result<bool> {
        let created = self.store.set_add(&self.rooms_key, room).await?;
        if created {
            self.store
                .hash_set_if_absent(&self.users_key, room, 0)
                .await?;
            debug!(room, "Room created");
        }
        Ok(created)
    }

    /// Count one more member, re-registering the room if a concurrent
    /// decrement removed it in between.
    pub async fn increment_membership(&self, room: &str) -> Result<u64> {
        let count = self.store.hash_incr(&self.users_key, room, 1).await?;
        self.store.set_add(&self.rooms_key, room).await?;
        Ok(count.max(0) as u64)
    }

    /// Count one member fewer; at zero the room is removed entirely.
    pub async fn decrement_membership(&self, room: &str) -> Result<u64> {
        let count = self.store.hash_incr(&self.users_key, room, -1).await?;
        if count <= 0 {
            self.store.hash_remove(&self.users_key, room).await?;
            self.store.set_remove(&self.rooms_key, room).await?;
            debug!(room, "Room removed");
            return Ok(0);
        }
        Ok(count as u64)
    }

    /// Current rooms sorted for display
    pub async fn list(&self) -> Result<Vec<RoomSummary>> {
        let names = self.store.set_members(&self.rooms_key).await?;
        let counts = self.store.hash_get_all(&self.users_key).await?;

        let mut rooms: Vec<RoomSummary> = names
            .into_iter()
            .map(|name| {
                let users = counts.get(&name).copied().unwrap_or(0).max(0) as u64;
                RoomSummary { name, users }
            })
            .collect();
        rooms.sort_by(|a, b| display_order(&a.name, &b.name));
        Ok(rooms)
    }

    /// Listing for push to clients; a store fault yields an empty listing
    pub async fn snapshot(&self) -> Vec<RoomSummary> {
        match self.list().await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!("Room listing unavailable: {}", e);
                metrics::counter!("chatrelay_store_errors_total", "op" => "directory_list")
                    .increment(1);
                Vec::new()
            }
        }
    }
}

/// Accent- and case-insensitive ordering. Ties fall back to accented
/// after plain, then lowercase before uppercase, so `alpha`, `beta`,
/// `Beta`, `éclair`, `zeta` sort the way a human expects.
fn display_order(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

/// Strip diacritics and case: `Éclair` becomes `eclair`
fn fold(name: &str) -> String {
    let combining = CanonicalCombiningClassMap::new();
    DecomposingNormalizer::new_nfd()
        .normalize(name)
        .chars()
        .filter(|c| combining.get_u8(*c) == 0)
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::MemoryStore;

    fn directory() -> (Arc<MemoryStore>, RoomDirectory) {
        let store = Arc::new(MemoryStore::new());
        let directory = RoomDirectory::new(store.clone(), "test");
        (store, directory)
    }

    #[tokio::test]
    async fn test_create_if_absent_rejects_duplicates() {
        let (_, directory) = directory();
        assert!(directory.create_if_absent("general").await.unwrap());
        assert!(!directory.create_if_absent("general").await.unwrap());

        let rooms = directory.list().await.unwrap();
        assert_eq!(
            rooms,
            vec![RoomSummary {
                name: "general".to_string(),
                users: 0
            }]
        );
    }

    #[tokio::test]
    async fn test_membership_counts_and_removal() {
        let (_, directory) = directory();
        directory.create_if_absent("general").await.unwrap();
        assert_eq!(directory.increment_membership("general").await.unwrap(), 1);
        assert_eq!(directory.increment_membership("general").await.unwrap(), 2);
        assert_eq!(directory.decrement_membership("general").await.unwrap(), 1);
        assert_eq!(directory.list().await.unwrap()[0].users, 1);

        assert_eq!(directory.decrement_membership("general").await.unwrap(), 0);
        assert!(directory.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decrement_unknown_room_never_goes_negative() {
        let (store, directory) = directory();
        assert_eq!(directory.decrement_membership("ghost").await.unwrap(), 0);
        assert!(store.hash_get_all("test:room-users").await.unwrap().is_empty());
        assert!(directory.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_increment_reregisters_removed_room() {
        let (_, directory) = directory();
        directory.create_if_absent("general").await.unwrap();
        // Another instance's decrement removed the room between our create and increment
        directory.decrement_membership("general").await.unwrap();
        assert_eq!(directory.increment_membership("general").await.unwrap(), 1);

        let rooms = directory.list().await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].users, 1);
    }

    #[tokio::test]
    async fn test_list_sorted_for_display() {
        let (_, directory) = directory();
        for name in ["zeta", "Beta", "alpha", "beta"] {
            directory.create_if_absent(name).await.unwrap();
        }
        let names: Vec<String> = directory
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alpha", "beta", "Beta", "zeta"]);
    }

    #[tokio::test]
    async fn test_accented_names_sort_with_their_base_letter() {
        let (_, directory) = directory();
        for name in ["zeta", "éclair", "Eagle", "ecole", "école", "apple"] {
            directory.create_if_absent(name).await.unwrap();
        }
        let names: Vec<String> = directory
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["apple", "Eagle", "éclair", "ecole", "école", "zeta"]);
    }

    #[tokio::test]
    async fn test_snapshot_degrades_to_empty() {
        let (store, directory) = directory();
        directory.create_if_absent("general").await.unwrap();
        store.set_unavailable(true);
        assert!(directory.list().await.is_err());
        assert!(directory.snapshot().await.is_empty());
    }
}

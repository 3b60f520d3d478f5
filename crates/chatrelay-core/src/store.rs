//! Shared coordination store seam
//!
//! Every instance talks to the same store. Only single-command atomic
//! primitives are exposed; no operation spans more than one key.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// Atomic key-value primitives shared by all instances
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Add `member` to the set at `key`; true when it was not present before
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove `member` from the set at `key`
    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;

    /// All members of the set at `key`
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Set `field` to `value` only when the field does not exist yet
    async fn hash_set_if_absent(&self, key: &str, field: &str, value: i64) -> Result<bool>;

    /// Atomically add `delta` to `field`, returning the new value
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    /// Delete `field` from the hash at `key`
    async fn hash_remove(&self, key: &str, field: &str) -> Result<()>;

    /// Every field of the hash at `key`
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>>;

    /// Append `value` to the tail of the list at `key`
    async fn list_push(&self, key: &str, value: &str) -> Result<()>;

    /// Keep only the last `keep` elements of the list at `key`
    async fn list_trim_to_last(&self, key: &str, keep: usize) -> Result<()>;

    /// Whole list at `key`, head first
    async fn list_range_all(&self, key: &str) -> Result<Vec<String>>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

/// In-process store for single-instance deployments and tests.
///
/// Instances sharing one `Arc<MemoryStore>` see the same state, which is
/// how the multi-instance tests simulate a shared backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    unavailable: AtomicBool,
}

#[derive(Default)]
struct MemoryInner {
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, i64>>,
    lists: HashMap<String, VecDeque<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the backend were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::store("memory store marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        Ok(inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.lock();
        if let Some(set) = inner.sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                inner.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hash_set_if_absent(&self, key: &str, field: &str, value: i64) -> Result<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        let hash = inner.hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value);
        Ok(true)
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        self.check()?;
        let mut inner = self.inner.lock();
        let slot = inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *slot += delta;
        Ok(*slot)
    }

    async fn hash_remove(&self, key: &str, field: &str) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.lock();
        if let Some(hash) = inner.hashes.get_mut(key) {
            hash.remove(field);
            if hash.is_empty() {
                inner.hashes.remove(key);
            }
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.lock();
        inner
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn list_trim_to_last(&self, key: &str, keep: usize) -> Result<()> {
        self.check()?;
        let mut inner = self.inner.lock();
        if keep == 0 {
            inner.lists.remove(key);
            return Ok(());
        }
        if let Some(list) = inner.lists.get_mut(key) {
            while list.len() > keep {
                list.pop_front();
            }
        }
        Ok(())
    }

    async fn list_range_all(&self, key: &str) -> Result<Vec<String>> {
        self.check()?;
        let inner = self.inner.lock();
        Ok(inner
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

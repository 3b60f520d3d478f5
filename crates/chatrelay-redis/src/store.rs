use async_trait::async_trait;
use chatrelay_core::{CoordinationStore, Error, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::collections::HashMap;
use tracing::info;

/// Coordination store backed by a shared Redis server.
///
/// Each trait method issues exactly one Redis command, so every call is
/// atomic on the server side.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

fn store_err(e: RedisError) -> Error {
    Error::store(e.to_string())
}

impl RedisStore {
    /// Connect to `url`; the manager reconnects transparently afterwards
    pub async fn connect(url: &str) -> Result<Self> {
        let client = crate::open_client(url)?;
        let addr = crate::server_addr(&client);
        let conn = ConnectionManager::new(client).await.map_err(store_err)?;
        info!("Connected coordination store to {}", addr);
        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let added: i64 = self.conn().sadd(key, member).await.map_err(store_err)?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.conn()
            .srem::<_, _, ()>(key, member)
            .await
            .map_err(store_err)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.conn().smembers(key).await.map_err(store_err)
    }

    async fn hash_set_if_absent(&self, key: &str, field: &str, value: i64) -> Result<bool> {
        self.conn()
            .hset_nx(key, field, value)
            .await
            .map_err(store_err)
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        self.conn().hincr(key, field, delta).await.map_err(store_err)
    }

    async fn hash_remove(&self, key: &str, field: &str) -> Result<()> {
        self.conn()
            .hdel::<_, _, ()>(key, field)
            .await
            .map_err(store_err)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>> {
        self.conn().hgetall(key).await.map_err(store_err)
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        self.conn()
            .rpush::<_, _, ()>(key, value)
            .await
            .map_err(store_err)
    }

    async fn list_trim_to_last(&self, key: &str, keep: usize) -> Result<()> {
        if keep == 0 {
            return self.conn().del::<_, ()>(key).await.map_err(store_err);
        }
        let start = -(keep as isize);
        self.conn()
            .ltrim::<_, ()>(key, start, -1)
            .await
            .map_err(store_err)
    }

    async fn list_range_all(&self, key: &str) -> Result<Vec<String>> {
        self.conn().lrange(key, 0, -1).await.map_err(store_err)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

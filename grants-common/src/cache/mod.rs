//! Durable key-value cache with per-entry TTL
//!
//! The enrichment pipeline stores two kinds of JSON documents here: the raw
//! application list of each round and the classifier features of each
//! application. Components receive an `Arc<dyn KvCache>` at construction;
//! the handle is opened once at process start and closed on shutdown.
//!
//! An expired entry is indistinguishable from an absent one.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// String-keyed JSON store with expiry
///
/// No cross-key atomicity is offered: reads and writes of different keys are
/// independent of each other.
#[async_trait]
pub trait KvCache: Send + Sync {
    /// Fetch a live entry, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or overwrite an entry that expires `ttl` from now
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Whether a live entry exists for `key`
    async fn has(&self, key: &str) -> Result<bool>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }

    /// Release underlying resources
    async fn close(&self) {}
}

/// Typed accessors layered over [`KvCache`]
#[async_trait]
pub trait KvCacheExt: KvCache {
    /// Fetch and decode a live entry
    ///
    /// A stored value that no longer matches `T` is reported as a
    /// serialization error, not as a miss.
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encode and store a value
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl).await
    }
}

impl<C: KvCache + ?Sized> KvCacheExt for C {}

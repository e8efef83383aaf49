//! # Record store
//!
//! Key-addressed document storage behind the [`RecordStore`] trait.
//!
//! ## Layout
//!
//! - One Redis hash per collection (`citizens`, `admins`, `issues`,
//!   `otp_citizens`, `otp_admins`)
//! - Hash field = record key (normalized email or issue ID)
//! - Hash value = the JSON document
//!
//! Lookups and writes are O(1) hash operations; equality queries and
//! full-collection listings walk the hash values and filter in process,
//! which is fine at this dataset's scale (thousands of records).
//!
//! No transactions: `update` is a read-merge-write and multi-record
//! sequences in the services are not atomic. Validation is the caller's
//! responsibility; the store accepts any JSON document.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use serde_json::Value;
use thiserror::Error;

pub const CITIZENS: &str = "citizens";
pub const ADMINS: &str = "admins";
pub const ISSUES: &str = "issues";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Store-client dependency injected into every service at startup. The
/// production implementation is [`RedisStore`]; tests and local runs use
/// [`MemoryStore`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, collection: &str, key: &str, document: Value) -> Result<(), StoreError>;

    /// Shallow merge of `partial` into the stored document. Creates the
    /// record when it does not exist yet.
    async fn update(&self, collection: &str, key: &str, partial: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    async fn query_by_equality(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}

fn merge_shallow(existing: Option<Value>, partial: Value) -> Value {
    match (existing, partial) {
        (Some(Value::Object(mut base)), Value::Object(changes)) => {
            for (key, value) in changes {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, partial) => partial,
    }
}

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url).unwrap();

    client
        .get_connection_manager_with_config(config)
        .await
        .unwrap()
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.hget(collection, key).await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, collection: &str, key: &str, document: Value) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let raw = serde_json::to_string(&document)?;
        let _: () = conn.hset(collection, key, raw).await?;

        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, partial: Value) -> Result<(), StoreError> {
        let existing = self.get(collection, key).await?;
        let merged = merge_shallow(existing, partial);

        self.set(collection, key, merged).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = conn.hdel(collection, key).await?;

        Ok(())
    }

    async fn query_by_equality(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let documents = self.list(collection).await?;

        Ok(documents
            .into_iter()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn.hvals(collection).await?;

        raw.iter()
            .map(|entry| serde_json::from_str(entry).map_err(StoreError::from))
            .collect()
    }
}

/// In-process store with the same semantics as [`RedisStore`]. Backs the
/// service tests and `STORE_BACKEND=memory` local runs.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collections<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, HashMap<String, Value>>) -> T,
    ) -> T {
        let mut guard = self.collections.lock().expect("store mutex poisoned");
        f(&mut guard)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.with_collections(|all| {
            all.get(collection).and_then(|records| records.get(key)).cloned()
        }))
    }

    async fn set(&self, collection: &str, key: &str, document: Value) -> Result<(), StoreError> {
        self.with_collections(|all| {
            all.entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), document);
        });

        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, partial: Value) -> Result<(), StoreError> {
        self.with_collections(|all| {
            let records = all.entry(collection.to_string()).or_default();
            let merged = merge_shallow(records.get(key).cloned(), partial);
            records.insert(key.to_string(), merged);
        });

        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.with_collections(|all| {
            if let Some(records) = all.get_mut(collection) {
                records.remove(key);
            }
        });

        Ok(())
    }

    async fn query_by_equality(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let documents = self.list(collection).await?;

        Ok(documents
            .into_iter()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self.with_collections(|all| {
            all.get(collection)
                .map(|records| records.values().cloned().collect())
                .unwrap_or_default()
        }))
    }
}

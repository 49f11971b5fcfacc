//! Key-value stores backing the coordinator.
//!
//! `MemoryStore` is the ephemeral store (survives navigation, gone with the
//! process); `FileStore` is the durable one, a single JSON document on disk.

use async_trait::async_trait;
use refill_common::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(vec![(key.to_string(), value)]).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Write several keys as one unit: either every value lands or none does.
    async fn set_many(&self, items: Vec<(String, Value)>) -> Result<(), StoreError>;
}

pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn to_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything, as a browser restart does to session storage.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn set_many(&self, items: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.extend(items);
        Ok(())
    }
}

/// Durable store persisted as one pretty-printed JSON object.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, and the in-memory copy is only updated once the file is in place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl FileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), keys = entries.len(), "Opened durable store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Durable store written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn set_many(&self, items: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.extend(items);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }
}

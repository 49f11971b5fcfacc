//! Durable profile storage.
//!
//! Layout in the durable store:
//! - `profiles`: ordered list of profile names (the index)
//! - `recordings`: `{ <profile name>: [CapturedEntry, ...] }`
//!
//! Both keys change together through one `set_many` under `write_lock`, so
//! the index and the entry map never diverge.

use crate::error::ProfileError;
use crate::store::{KeyValueStore, get_typed, to_value};
use refill_common::CapturedEntry;
use refill_common::error::ValidationError;
use refill_common::naming::{unique_profile_name, validate_profile_name};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const PROFILES_KEY: &str = "profiles";
pub const RECORDINGS_KEY: &str = "recordings";

type Recordings = BTreeMap<String, Vec<CapturedEntry>>;

pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Result<Vec<String>, ProfileError> {
        Ok(get_typed(&*self.store, PROFILES_KEY).await?.unwrap_or_default())
    }

    pub async fn entries(&self, name: &str) -> Result<Vec<CapturedEntry>, ProfileError> {
        self.recordings()
            .await?
            .remove(name)
            .ok_or_else(|| ValidationError::UnknownProfile(name.to_string()).into())
    }

    /// Reserve a profile under `requested`, suffixed with ` (n)` if taken.
    /// Returns the name actually stored.
    pub async fn create_unique(&self, requested: &str) -> Result<String, ProfileError> {
        self.insert_unique(requested, Vec::new()).await
    }

    /// Append one entry, creating the profile on first write. Returns the
    /// profile's entry count.
    pub async fn append_entry(
        &self,
        name: &str,
        entry: CapturedEntry,
    ) -> Result<usize, ProfileError> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.list().await?;
        let mut recordings = self.recordings().await?;

        if !index.iter().any(|n| n == name) {
            index.push(name.to_string());
        }
        let entries = recordings.entry(name.to_string()).or_default();
        entries.push(entry);
        let count = entries.len();

        self.save(index, recordings).await?;
        debug!(profile = name, count, "Entry appended");
        Ok(count)
    }

    /// Remove a profile and its entries. Returns false if it did not exist.
    pub async fn delete(&self, name: &str) -> Result<bool, ProfileError> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.list().await?;
        let mut recordings = self.recordings().await?;

        let listed = index.len();
        index.retain(|n| n != name);
        let had_entries = recordings.remove(name).is_some();
        if index.len() == listed && !had_entries {
            return Ok(false);
        }

        self.save(index, recordings).await?;
        info!(profile = name, "Profile deleted");
        Ok(true)
    }

    pub async fn export(&self, name: &str) -> Result<String, ProfileError> {
        let entries = self.entries(name).await?;
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Import a JSON entry list under a fresh unique name.
    pub async fn import(&self, requested: &str, json: &str) -> Result<String, ProfileError> {
        let entries: Vec<CapturedEntry> = serde_json::from_str(json)?;
        self.insert_unique(requested, entries).await
    }

    async fn insert_unique(
        &self,
        requested: &str,
        entries: Vec<CapturedEntry>,
    ) -> Result<String, ProfileError> {
        let base = validate_profile_name(requested)?;
        let _guard = self.write_lock.lock().await;
        let mut index = self.list().await?;
        let mut recordings = self.recordings().await?;

        let name = unique_profile_name(&base, &index);
        index.push(name.clone());
        let count = entries.len();
        recordings.insert(name.clone(), entries);

        self.save(index, recordings).await?;
        info!(requested = %base, profile = %name, entries = count, "Profile created");
        Ok(name)
    }

    async fn recordings(&self) -> Result<Recordings, ProfileError> {
        Ok(get_typed(&*self.store, RECORDINGS_KEY).await?.unwrap_or_default())
    }

    async fn save(&self, index: Vec<String>, recordings: Recordings) -> Result<(), ProfileError> {
        self.store
            .set_many(vec![
                (PROFILES_KEY.to_string(), to_value(&index)?),
                (RECORDINGS_KEY.to_string(), to_value(&recordings)?),
            ])
            .await?;
        Ok(())
    }
}

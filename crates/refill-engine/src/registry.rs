//! Per-tab recording registry, stored in the ephemeral store under
//! `recordingTabs` as `{ "<tab id>": { "profileName": ... } }`.
//!
//! Every mutation reads and rewrites the whole map. That is only safe because
//! the coordinator task is the sole caller of the mutating methods and
//! handles one request at a time.

use crate::store::{KeyValueStore, get_typed, to_value};
use refill_common::error::StoreError;
use refill_common::{RecordingState, TabId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

pub const RECORDING_TABS_KEY: &str = "recordingTabs";

type Tabs = BTreeMap<String, RecordingState>;

pub struct RecordingRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl RecordingRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, tab: TabId) -> Result<Option<RecordingState>, StoreError> {
        Ok(self.load().await?.remove(&tab.to_string()))
    }

    pub async fn snapshot(&self) -> Result<BTreeMap<TabId, RecordingState>, StoreError> {
        let mut out = BTreeMap::new();
        for (key, state) in self.load().await? {
            match key.parse::<TabId>() {
                Ok(tab) => {
                    out.insert(tab, state);
                }
                Err(_) => warn!(key = %key, "Ignoring malformed registry key"),
            }
        }
        Ok(out)
    }

    /// Upsert the tab's entry.
    pub async fn insert(&self, tab: TabId, profile_name: &str) -> Result<(), StoreError> {
        let mut tabs = self.load().await?;
        tabs.insert(
            tab.to_string(),
            RecordingState {
                profile_name: profile_name.to_string(),
            },
        );
        self.save(&tabs).await
    }

    pub async fn remove(&self, tab: TabId) -> Result<Option<RecordingState>, StoreError> {
        let mut tabs = self.load().await?;
        let removed = tabs.remove(&tab.to_string());
        if removed.is_some() {
            self.save(&tabs).await?;
        }
        Ok(removed)
    }

    /// Drop every tab recording into `profile_name`, returning those tabs.
    pub async fn remove_profile(&self, profile_name: &str) -> Result<Vec<TabId>, StoreError> {
        let mut tabs = self.load().await?;
        let doomed: Vec<String> = tabs
            .iter()
            .filter(|(_, state)| state.profile_name == profile_name)
            .map(|(key, _)| key.clone())
            .collect();
        if doomed.is_empty() {
            return Ok(Vec::new());
        }
        for key in &doomed {
            tabs.remove(key);
        }
        self.save(&tabs).await?;
        Ok(doomed.iter().filter_map(|k| k.parse().ok()).collect())
    }

    async fn load(&self) -> Result<Tabs, StoreError> {
        Ok(get_typed(&*self.store, RECORDING_TABS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, tabs: &Tabs) -> Result<(), StoreError> {
        self.store.set(RECORDING_TABS_KEY, to_value(tabs)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn stored_shape_uses_string_tab_keys() {
        let store = Arc::new(MemoryStore::new());
        let registry = RecordingRegistry::new(store.clone());
        registry.insert(TabId(7), "signup").await.unwrap();

        assert_eq!(
            store.get(RECORDING_TABS_KEY).await.unwrap(),
            Some(json!({ "7": { "profileName": "signup" } }))
        );
    }

    #[tokio::test]
    async fn remove_profile_clears_only_matching_tabs() {
        let registry = RecordingRegistry::new(Arc::new(MemoryStore::new()));
        registry.insert(TabId(1), "a").await.unwrap();
        registry.insert(TabId(2), "b").await.unwrap();
        registry.insert(TabId(3), "a").await.unwrap();

        assert_eq!(
            registry.remove_profile("a").await.unwrap(),
            vec![TabId(1), TabId(3)]
        );
        let left = registry.snapshot().await.unwrap();
        assert_eq!(left.keys().copied().collect::<Vec<_>>(), vec![TabId(2)]);
        assert_eq!(registry.remove(TabId(9)).await.unwrap(), None);
    }
}

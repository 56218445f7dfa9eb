use std::collections::BTreeMap;
use std::sync::RwLock;

use prefs_types::Value;
use tracing::debug;

use crate::batch::EditBatch;
use crate::error::StoreResult;
use crate::traits::KeyValueStore;

/// In-memory, map-based key-value store.
///
/// Intended for tests and embedding. Entries live behind a `RwLock`; a commit
/// holds the write lock for the whole batch, so readers see either none or
/// all of it. Data is lost when the store is dropped.
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.read()?.len())
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.entries.read()?.is_empty())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.entries.read()?.get(key).cloned())
    }

    fn get_all(&self) -> StoreResult<BTreeMap<String, Value>> {
        Ok(self.entries.read()?.clone())
    }

    fn commit_batch(&self, batch: EditBatch) -> StoreResult<()> {
        batch.check_storable()?;
        let ops = batch.len();
        let mut entries = self.entries.write()?;
        batch.apply_to(&mut entries);
        debug!(ops, entries = entries.len(), "in-memory commit");
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.read()?.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|e| e.len()).ok();
        f.debug_struct("InMemoryStore")
            .field("entry_count", &count)
            .finish()
    }
}

//! Key-value stores: the synchronized settings store and the session-scoped fold store.

use std::collections::BTreeMap;

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store rejected the write: {0}")]
    Rejected(String),

    #[error("could not encode value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which store a change notification came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Small synchronized store holding the user's [`crate::Options`].
    Sync,

    /// Session-scoped store (cleared when the browser session ends).
    Session,
}

/// Old/new value pair for one key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StorageChange {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

pub type StorageChanges = BTreeMap<String, StorageChange>;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;

    fn get_all(&self) -> BTreeMap<String, Value>;

    fn set(&mut self, items: BTreeMap<String, Value>) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    fn set_one(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut items = BTreeMap::new();
        items.insert(key.to_owned(), value);
        self.set(items)
    }
}

/// In-memory store that queues the change notifications a real store would emit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
    pending: Vec<StorageChanges>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            pending: Vec::new(),
        }
    }

    /// Change notifications produced since the last call.
    pub fn take_changes(&mut self) -> Vec<StorageChanges> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn get_all(&self) -> BTreeMap<String, Value> {
        self.values.clone()
    }

    fn set(&mut self, items: BTreeMap<String, Value>) -> Result<(), StoreError> {
        let mut changes = StorageChanges::new();
        for (key, value) in items {
            let old_value = self.values.insert(key.clone(), value.clone());
            if old_value.as_ref() != Some(&value) {
                changes.insert(
                    key,
                    StorageChange {
                        old_value,
                        new_value: Some(value),
                    },
                );
            }
        }
        if !changes.is_empty() {
            self.pending.push(changes);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if let Some(old_value) = self.values.remove(key) {
            let mut changes = StorageChanges::new();
            changes.insert(
                key.to_owned(),
                StorageChange {
                    old_value: Some(old_value),
                    new_value: None,
                },
            );
            self.pending.push(changes);
        }
        Ok(())
    }
}

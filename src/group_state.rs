//! Shadow copy of each group's fold state, persisted in the session store.

use ahash::HashMap;
use serde_json::Value;

use crate::model::GroupId;
use crate::store::KeyValueStore;

const KEY_PREFIX: &str = "groupCollapsed:";

fn store_key(group: GroupId) -> String {
    format!("{KEY_PREFIX}{}", group.0)
}

#[derive(Debug, Default)]
pub struct GroupStateStore {
    collapsed: HashMap<GroupId, bool>,
}

impl GroupStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every persisted entry from the session store.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let collapsed = store
            .get_all()
            .into_iter()
            .filter_map(|(key, value)| {
                let id = key.strip_prefix(KEY_PREFIX)?.parse().ok()?;
                Some((GroupId(id), value.as_bool()?))
            })
            .collect();
        Self { collapsed }
    }

    /// # Panics
    /// If `group` was never registered. That is a construction-order bug, not a runtime condition.
    #[track_caller]
    pub fn is_collapsed(&self, group: GroupId) -> bool {
        match self.collapsed.get(&group) {
            Some(&collapsed) => collapsed,
            None => panic!("fold state of {group} queried before the group was registered"),
        }
    }

    pub fn get(&self, group: GroupId) -> Option<bool> {
        self.collapsed.get(&group).copied()
    }

    pub fn contains(&self, group: GroupId) -> bool {
        self.collapsed.contains_key(&group)
    }

    /// Register `group` unless we already know it. Returns the resulting state.
    pub fn ensure(&mut self, group: GroupId, default_collapsed: bool) -> bool {
        *self.collapsed.entry(group).or_insert(default_collapsed)
    }

    /// Set and persist. Persisting is fire-and-forget: failures are only logged.
    pub fn set_collapsed(&mut self, group: GroupId, collapsed: bool, store: &mut dyn KeyValueStore) {
        self.collapsed.insert(group, collapsed);
        if let Err(err) = store.set_one(&store_key(group), Value::Bool(collapsed)) {
            log::warn!("failed to persist fold state of {group}: {err}");
        }
    }

    pub fn collapse(&mut self, group: GroupId, store: &mut dyn KeyValueStore) {
        self.set_collapsed(group, true, store);
    }

    pub fn expand(&mut self, group: GroupId, store: &mut dyn KeyValueStore) {
        self.set_collapsed(group, false, store);
    }

    pub fn forget(&mut self, group: GroupId, store: &mut dyn KeyValueStore) {
        self.collapsed.remove(&group);
        if let Err(err) = store.remove(&store_key(group)) {
            log::warn!("failed to forget fold state of {group}: {err}");
        }
    }

    pub fn len(&self) -> usize {
        self.collapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }
}

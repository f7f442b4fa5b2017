//! Secondary indices: `index name -> indexed value -> set<record id>`.
//!
//! Domain specializations declare a fixed set of index names (e.g. the user
//! domain indexes `email` and `status`); [`IndexSet`] owns the maps for a
//! single processor and keeps them consistent with `store`/`delete`.

use std::collections::{HashMap, HashSet};

/// One named secondary index over a JSON scalar.
#[derive(Debug, Default)]
struct SingleIndex {
    by_value: HashMap<String, HashSet<String>>,
}

impl SingleIndex {
    fn insert(&mut self, value: &str, record_id: &str) {
        self.by_value
            .entry(value.to_string())
            .or_default()
            .insert(record_id.to_string());
    }

    fn remove(&mut self, value: &str, record_id: &str) {
        if let Some(ids) = self.by_value.get_mut(value) {
            ids.remove(record_id);
            if ids.is_empty() {
                self.by_value.remove(value);
            }
        }
    }

    fn lookup(&self, value: &str) -> Vec<String> {
        self.by_value
            .get(value)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// The full set of secondary indices maintained by one processor.
#[derive(Debug, Default)]
pub struct IndexSet {
    indices: HashMap<String, SingleIndex>,
}

impl IndexSet {
    /// Create an index set over the given index names, all initially empty.
    pub fn new(index_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut indices = HashMap::new();
        for name in index_names {
            indices.insert(name.into(), SingleIndex::default());
        }
        IndexSet { indices }
    }

    /// Names of every index this set maintains.
    pub fn names(&self) -> Vec<&str> {
        self.indices.keys().map(|s| s.as_str()).collect()
    }

    /// Record that `record_id` has `value` for `index_name`. No-op if
    /// `index_name` isn't one of the indices this set was built with.
    pub fn insert(&mut self, index_name: &str, value: &str, record_id: &str) {
        if let Some(index) = self.indices.get_mut(index_name) {
            index.insert(value, record_id);
        }
    }

    /// Remove `record_id` from `index_name` at `value`.
    pub fn remove(&mut self, index_name: &str, value: &str, record_id: &str) {
        if let Some(index) = self.indices.get_mut(index_name) {
            index.remove(value, record_id);
        }
    }

    /// Every record id recorded under `value` in `index_name`.
    pub fn lookup(&self, index_name: &str, value: &str) -> Vec<String> {
        self.indices
            .get(index_name)
            .map(|index| index.lookup(value))
            .unwrap_or_default()
    }

    /// Whether `index_name` is one of this set's declared indices.
    pub fn has_index(&self, index_name: &str) -> bool {
        self.indices.contains_key(index_name)
    }
}

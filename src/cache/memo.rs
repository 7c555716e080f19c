use std::collections::HashMap;
use std::sync::RwLock;

use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memo";

/// Per-worker memo of rendered banner markup, grouped by banner identifier so
/// one banner's renders can be forgotten without touching the others.
#[derive(Debug, Default)]
pub struct RenderMemo {
    entries: RwLock<HashMap<String, HashMap<CacheKey, String>>>,
}

impl RenderMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str, key: &CacheKey) -> Option<String> {
        rw_read(&self.entries, SOURCE, "get")
            .get(identifier)
            .and_then(|variants| variants.get(key))
            .cloned()
    }

    pub fn insert(&self, identifier: &str, key: CacheKey, markup: String) {
        rw_write(&self.entries, SOURCE, "insert")
            .entry(identifier.to_string())
            .or_default()
            .insert(key, markup);
    }

    /// Forget every render of `identifier`; returns how many were dropped.
    pub fn remove(&self, identifier: &str) -> usize {
        rw_write(&self.entries, SOURCE, "remove")
            .remove(identifier)
            .map_or(0, |variants| variants.len())
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len")
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

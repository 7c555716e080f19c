use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;

use crate::cache::keys::CacheKey;
use crate::cache::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::tier::memory";

/// Per-worker memory tier.
///
/// Never shared across workers and never expires: it lives exactly as long
/// as the worker context that owns it.
#[derive(Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<CacheKey, Bytes>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    pub fn set(&self, key: CacheKey, value: Bytes) {
        rw_write(&self.entries, SOURCE, "set").insert(key, value);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains_key(key)
    }

    pub fn delete(&self, key: &CacheKey) {
        rw_write(&self.entries, SOURCE, "delete").remove(key);
    }

    /// Returns the number of removed entries.
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_by_prefix");
        let before = entries.len();
        entries.retain(|key, _| !key.has_prefix(prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

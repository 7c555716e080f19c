use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tracing::{info, warn};

use super::CacheTier;
use crate::cache::error::TierError;
use crate::cache::keys::CacheKey;
use crate::cache::lock::mutex_lock;

const SOURCE: &str = "cache::tier::object";
const TIER: &str = "object";

/// Process-wide grouped key/value service.
#[async_trait]
pub trait ObjectCacheService: Send + Sync {
    async fn get(&self, key: &str, group: &str) -> Result<Option<Bytes>, TierError>;

    async fn set(&self, key: &str, value: Bytes, group: &str, ttl: Duration)
    -> Result<(), TierError>;

    async fn delete(&self, key: &str, group: &str) -> Result<(), TierError>;

    /// Drop every entry of `group`. Returns `Ok(false)` when the service has
    /// no group invalidation, in which case callers fall back to a full flush.
    async fn delete_group(&self, _group: &str) -> Result<bool, TierError> {
        Ok(false)
    }

    async fn flush_all(&self) -> Result<(), TierError>;
}

/// Adapts an [`ObjectCacheService`] to the tier contract.
///
/// The service has no prefix delete, so a prefix purge drops the whole group
/// (or everything, when groups are unsupported).
pub struct ObjectCacheTier {
    service: Arc<dyn ObjectCacheService>,
    group: String,
}

impl ObjectCacheTier {
    pub fn new(service: Arc<dyn ObjectCacheService>, group: impl Into<String>) -> Self {
        Self {
            service,
            group: group.into(),
        }
    }

    async fn purge_group(&self, reason: &'static str) -> Result<(), TierError> {
        if self.service.delete_group(&self.group).await? {
            info!(tier = TIER, group = %self.group, reason, "object cache group purged");
            return Ok(());
        }

        warn!(
            tier = TIER,
            group = %self.group,
            reason,
            "object cache lacks group invalidation, flushing all entries"
        );
        self.service.flush_all().await
    }
}

#[async_trait]
impl CacheTier for ObjectCacheTier {
    fn name(&self) -> &'static str {
        TIER
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, TierError> {
        self.service.get(key.as_str(), &self.group).await
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), TierError> {
        self.service.set(key.as_str(), value, &self.group, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), TierError> {
        self.service.delete(key.as_str(), &self.group).await
    }

    async fn delete_by_prefix(&self, _prefix: &str) -> Result<(), TierError> {
        self.purge_group("prefix").await
    }

    async fn flush_all(&self) -> Result<(), TierError> {
        self.purge_group("flush").await
    }
}

struct ObjectEntry {
    value: Bytes,
    expires_at: Instant,
}

/// In-process object cache: LRU-bounded, with per-entry expiry and group
/// invalidation.
pub struct LocalObjectCache {
    entries: Mutex<LruCache<(String, String), ObjectEntry>>,
}

impl LocalObjectCache {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(limit)),
        }
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectCacheService for LocalObjectCache {
    async fn get(&self, key: &str, group: &str) -> Result<Option<Bytes>, TierError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let id = (group.to_string(), key.to_string());

        let expired = match entries.get(&id) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(&id);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: Bytes,
        group: &str,
        ttl: Duration,
    ) -> Result<(), TierError> {
        let id = (group.to_string(), key.to_string());
        let entry = ObjectEntry {
            value,
            expires_at: Instant::now() + ttl,
        };

        let evicted = mutex_lock(&self.entries, SOURCE, "set").push(id.clone(), entry);
        if evicted.is_some_and(|(evicted_id, _)| evicted_id != id) {
            counter!("banner_cache_object_evict_total").increment(1);
        }
        Ok(())
    }

    async fn delete(&self, key: &str, group: &str) -> Result<(), TierError> {
        mutex_lock(&self.entries, SOURCE, "delete").pop(&(group.to_string(), key.to_string()));
        Ok(())
    }

    async fn delete_group(&self, group: &str) -> Result<bool, TierError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "delete_group");
        let doomed: Vec<(String, String)> = entries
            .iter()
            .filter(|((entry_group, _), _)| entry_group == group)
            .map(|(id, _)| id.clone())
            .collect();
        for id in doomed {
            entries.pop(&id);
        }
        Ok(true)
    }

    async fn flush_all(&self) -> Result<(), TierError> {
        mutex_lock(&self.entries, SOURCE, "flush_all").clear();
        Ok(())
    }
}

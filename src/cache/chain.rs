//! Tier chain: read-through cascade and best-effort write/purge fan-out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, warn};

use super::context::CacheBackends;
use super::error::TierError;
use super::keys::CacheKey;
use super::tier::{CacheTier, MemoryTier};

const METRIC_TIER_HIT: &str = "banner_cache_tier_hit_total";
const METRIC_TIER_MISS: &str = "banner_cache_tier_miss_total";
const METRIC_TIER_ERROR: &str = "banner_cache_tier_error_total";

/// Run one tier operation, logging and counting a failure instead of
/// returning it. `None` means the operation failed.
pub(crate) async fn attempt<T, F>(tier: &'static str, op: &'static str, target: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, TierError>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(err) => {
            counter!(METRIC_TIER_ERROR, "tier" => tier, "op" => op).increment(1);
            warn!(tier, op, target, error = %err, "cache tier operation failed");
            None
        }
    }
}

/// Ordered cache tiers of one worker.
///
/// Reads stop at the first hit and back-fill only the memory tier: a hit in
/// the distributed store is not copied into the object cache.
pub struct TierChain {
    memory: MemoryTier,
    object: Option<Arc<dyn CacheTier>>,
    distributed: Option<Arc<dyn CacheTier>>,
    fallback: Option<Arc<dyn CacheTier>>,
}

impl TierChain {
    pub fn new(backends: &CacheBackends) -> Self {
        Self {
            memory: MemoryTier::new(),
            object: backends.object(),
            distributed: backends.distributed(),
            fallback: backends.fallback(),
        }
    }

    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    pub async fn read(&self, key: &CacheKey) -> Option<Bytes> {
        if let Some(value) = self.memory.get(key) {
            record_hit("memory", key);
            return Some(value);
        }

        if let Some(value) = self.probe(self.object.as_deref(), key).await {
            self.memory.set(key.clone(), value.clone());
            return Some(value);
        }

        if let Some(value) = self.probe(self.distributed.as_deref(), key).await {
            self.memory.set(key.clone(), value.clone());
            return Some(value);
        }

        // The durable table only serves reads when no faster shared tier exists.
        if self.object.is_none() && self.distributed.is_none() {
            if let Some(value) = self.probe(self.fallback.as_deref(), key).await {
                self.memory.set(key.clone(), value.clone());
                return Some(value);
            }
        }

        counter!(METRIC_TIER_MISS).increment(1);
        debug!(key = %key, outcome = "miss", "all cache tiers missed");
        None
    }

    /// Whether `key` is present in memory or in the object cache.
    pub async fn is_warm(&self, key: &CacheKey) -> bool {
        if self.memory.contains(key) {
            return true;
        }
        match self.object.as_deref() {
            Some(tier) => matches!(
                attempt(tier.name(), "get", key.as_str(), tier.get(key)).await,
                Some(Some(_))
            ),
            None => false,
        }
    }

    /// Write to every configured tier. Failures are logged per tier and never
    /// stop the remaining writes.
    pub async fn write(&self, key: &CacheKey, value: Bytes, ttl: Duration) {
        for tier in self.shared_tiers() {
            attempt(
                tier.name(),
                "set",
                key.as_str(),
                tier.set(key, value.clone(), ttl),
            )
            .await;
        }
        self.memory.set(key.clone(), value);
    }

    /// Purge every entry whose key starts with `prefix` from every tier.
    pub async fn delete_prefix(&self, prefix: &str) {
        for tier in self.shared_tiers() {
            attempt(tier.name(), "delete_prefix", prefix, tier.delete_by_prefix(prefix)).await;
        }
        let removed = self.memory.delete_by_prefix(prefix);
        info!(prefix, memory_removed = removed, "cache prefix purged");
    }

    /// Drop every entry of the namespace from every tier.
    pub async fn flush_all(&self) {
        for tier in self.shared_tiers() {
            attempt(tier.name(), "flush_all", "*", tier.flush_all()).await;
        }
        self.memory.clear();
        info!("cache flushed");
    }

    async fn probe(&self, tier: Option<&dyn CacheTier>, key: &CacheKey) -> Option<Bytes> {
        let tier = tier?;
        let value = attempt(tier.name(), "get", key.as_str(), tier.get(key))
            .await
            .flatten()?;
        record_hit(tier.name(), key);
        Some(value)
    }

    fn shared_tiers(&self) -> impl Iterator<Item = &dyn CacheTier> {
        [&self.object, &self.distributed, &self.fallback]
            .into_iter()
            .filter_map(|tier| tier.as_deref())
    }
}

fn record_hit(tier: &'static str, key: &CacheKey) {
    counter!(METRIC_TIER_HIT, "tier" => tier).increment(1);
    debug!(tier, key = %key, outcome = "hit", "cache hit");
}

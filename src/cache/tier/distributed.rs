use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, error};

use super::CacheTier;
use crate::cache::error::TierError;
use crate::cache::keys::CacheKey;

const TIER: &str = "distributed";

/// Remote key/value store with pattern scans (Redis-like).
#[async_trait]
pub trait DistributedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError>;

    async fn setex(&self, key: &str, ttl: Duration, value: &[u8]) -> Result<(), TierError>;

    /// Keys matching a glob `pattern`.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, TierError>;

    async fn del(&self, keys: &[String]) -> Result<(), TierError>;
}

/// Distributed tier with one-way degradation.
///
/// The first [`TierError::Unavailable`] turns the tier into an always-miss
/// no-op for the rest of the process; it is never retried. Reconnecting
/// requires a restart.
pub struct DistributedTier {
    store: Arc<dyn DistributedStore>,
    namespace_prefix: String,
    degraded: AtomicBool,
}

impl DistributedTier {
    pub fn new(store: Arc<dyn DistributedStore>, namespace_prefix: impl Into<String>) -> Self {
        Self {
            store,
            namespace_prefix: namespace_prefix.into(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn observe<T>(&self, result: Result<T, TierError>) -> Result<T, TierError> {
        if let Err(err) = &result {
            if err.is_unavailable() && !self.degraded.swap(true, Ordering::AcqRel) {
                error!(
                    tier = TIER,
                    error = %err,
                    "distributed store unreachable, disabled until restart"
                );
            }
        }
        result
    }

    async fn purge(&self, prefix: &str) -> Result<(), TierError> {
        if self.is_degraded() {
            return Ok(());
        }

        let pattern = format!("{prefix}*");
        let keys = self.observe(self.store.keys(&pattern).await)?;
        if keys.is_empty() {
            return Ok(());
        }

        debug!(tier = TIER, %pattern, count = keys.len(), "deleting matched keys");
        self.observe(self.store.del(&keys).await)
    }
}

#[async_trait]
impl CacheTier for DistributedTier {
    fn name(&self) -> &'static str {
        TIER
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, TierError> {
        if self.is_degraded() {
            return Ok(None);
        }
        let value = self.observe(self.store.get(key.as_str()).await)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), TierError> {
        if self.is_degraded() {
            return Ok(());
        }
        self.observe(self.store.setex(key.as_str(), ttl, &value).await)
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), TierError> {
        if self.is_degraded() {
            return Ok(());
        }
        self.observe(self.store.del(&[key.as_str().to_string()]).await)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), TierError> {
        self.purge(prefix).await
    }

    async fn flush_all(&self) -> Result<(), TierError> {
        self.purge(&self.namespace_prefix).await
    }
}

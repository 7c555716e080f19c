//! Cache tiers.
//!
//! Every tier except [`MemoryTier`] is shared between workers and hides its
//! backend behind a collaborator trait, so any of them may be absent.

mod distributed;
mod fallback;
mod memory;
mod object;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::error::TierError;
use super::keys::CacheKey;

pub use distributed::{DistributedStore, DistributedTier};
pub use fallback::{FallbackTable, FallbackTier, escape_like};
pub use memory::MemoryTier;
pub use object::{LocalObjectCache, ObjectCacheService, ObjectCacheTier};

/// Uniform capabilities of a shared tier.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, TierError>;

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), TierError>;

    async fn delete(&self, key: &CacheKey) -> Result<(), TierError>;

    /// Remove every entry whose key starts with `prefix`. Tiers without
    /// prefix support may remove more than that.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), TierError>;

    /// Remove every entry of this cache's namespace.
    async fn flush_all(&self) -> Result<(), TierError>;
}

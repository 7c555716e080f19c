use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::debug;

use super::CacheTier;
use crate::cache::error::TierError;
use crate::cache::keys::CacheKey;

const TIER: &str = "fallback";

/// Durable key → (value, expiry) table.
#[async_trait]
pub trait FallbackTable: Send + Sync {
    /// Expired rows read as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError>;

    async fn put(&self, key: &str, value: &[u8], expires_at: OffsetDateTime)
    -> Result<(), TierError>;

    async fn delete(&self, key: &str) -> Result<(), TierError>;

    /// Delete every row whose key starts with `prefix`; returns the row count.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, TierError>;
}

/// Escape `LIKE` metacharacters so `prefix` matches literally.
pub fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 4);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Persistence-layer tier backed by a [`FallbackTable`].
pub struct FallbackTier {
    table: Arc<dyn FallbackTable>,
    namespace_prefix: String,
}

impl FallbackTier {
    pub fn new(table: Arc<dyn FallbackTable>, namespace_prefix: impl Into<String>) -> Self {
        Self {
            table,
            namespace_prefix: namespace_prefix.into(),
        }
    }
}

#[async_trait]
impl CacheTier for FallbackTier {
    fn name(&self) -> &'static str {
        TIER
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, TierError> {
        Ok(self.table.get(key.as_str()).await?.map(Bytes::from))
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), TierError> {
        let expires_at = OffsetDateTime::now_utc() + ttl;
        self.table.put(key.as_str(), &value, expires_at).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), TierError> {
        self.table.delete(key.as_str()).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), TierError> {
        let removed = self.table.delete_prefix(prefix).await?;
        debug!(tier = TIER, prefix, removed, "fallback rows deleted");
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), TierError> {
        self.delete_by_prefix(&self.namespace_prefix).await
    }
}

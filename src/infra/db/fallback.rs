use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use time::OffsetDateTime;
use tracing::debug;

use crate::cache::{FallbackTable, TierError, escape_like};

use super::util::map_tier_error;

/// `cache_fallback` table: key → (value, expiry).
#[derive(Clone)]
pub struct PostgresFallbackTable {
    pool: Arc<PgPool>,
}

impl PostgresFallbackTable {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn delete_expired(&self, key: &str) -> Result<(), TierError> {
        sqlx::query("DELETE FROM cache_fallback WHERE cache_key = $1 AND expires_at <= now()")
            .bind(key)
            .execute(self.pool.as_ref())
            .await
            .map_err(|err| map_tier_error(err, "delete"))?;
        Ok(())
    }
}

#[async_trait]
impl FallbackTable for PostgresFallbackTable {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError> {
        let row: Option<(Vec<u8>, OffsetDateTime)> =
            sqlx::query_as("SELECT value, expires_at FROM cache_fallback WHERE cache_key = $1")
                .bind(key)
                .fetch_optional(self.pool.as_ref())
                .await
                .map_err(|err| map_tier_error(err, "get"))?;

        match row {
            Some((value, expires_at)) if expires_at > OffsetDateTime::now_utc() => Ok(Some(value)),
            Some(_) => {
                debug!(key, "expired fallback row removed");
                self.delete_expired(key).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<(), TierError> {
        sqlx::query(
            "INSERT INTO cache_fallback (cache_key, value, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (cache_key) DO UPDATE \
             SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|err| map_tier_error(err, "put"))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        sqlx::query("DELETE FROM cache_fallback WHERE cache_key = $1")
            .bind(key)
            .execute(self.pool.as_ref())
            .await
            .map_err(|err| map_tier_error(err, "delete"))?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, TierError> {
        let pattern = format!("{}%", escape_like(prefix));
        let result = sqlx::query("DELETE FROM cache_fallback WHERE cache_key LIKE $1 ESCAPE '\\'")
            .bind(pattern)
            .execute(self.pool.as_ref())
            .await
            .map_err(|err| map_tier_error(err, "delete_prefix"))?;
        Ok(result.rows_affected())
    }
}

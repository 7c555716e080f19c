//! Redis-backed distributed store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ErrorKind, RedisError};
use tracing::info;

use crate::cache::{DistributedStore, TierError};

use super::error::InfraError;

const TIER: &str = "distributed";

#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(url)
            .map_err(|err| InfraError::redis(format!("redis client: {err}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| InfraError::redis(format!("redis connect: {err}")))?;
        info!("connected to redis");
        Ok(Self { manager })
    }
}

/// Connectivity, authentication and protocol failures make the store
/// unavailable; everything else fails only the current call.
fn classify(err: RedisError, op: &'static str) -> TierError {
    let unavailable = err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
        || matches!(
            err.kind(),
            ErrorKind::AuthenticationFailed | ErrorKind::ParseError
        );

    if unavailable {
        TierError::unavailable(TIER, format!("redis {op}: {err}"))
    } else {
        TierError::operation(TIER, op, err.to_string())
    }
}

#[async_trait]
impl DistributedStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(|err| classify(err, "get"))
    }

    async fn setex(&self, key: &str, ttl: Duration, value: &[u8]) -> Result<(), TierError> {
        let mut conn = self.manager.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|err| classify(err, "setex"))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, TierError> {
        let mut conn = self.manager.clone();
        conn.keys(pattern).await.map_err(|err| classify(err, "keys"))
    }

    async fn del(&self, keys: &[String]) -> Result<(), TierError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(keys)
            .await
            .map_err(|err| classify(err, "del"))
    }
}

use crate::application::repos::RepoError;
use crate::cache::TierError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

/// Fallback-table failures: lost connectivity makes the tier unavailable,
/// anything else fails the single operation.
pub(crate) fn map_tier_error(err: sqlx::Error, op: &'static str) -> TierError {
    const TIER: &str = "fallback";
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => TierError::unavailable(TIER, err.to_string()),
        other => TierError::operation(TIER, op, other.to_string()),
    }
}

//! Tier failure taxonomy.
//!
//! None of these reach callers of the cache: the chain logs them and treats
//! the affected tier as a miss or a no-op.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TierError {
    /// Connection, authentication or protocol failure.
    #[error("{tier} unavailable: {message}")]
    Unavailable { tier: &'static str, message: String },
    /// A single get/set/delete call failed.
    #[error("{tier} {op} failed: {message}")]
    OperationFailed {
        tier: &'static str,
        op: &'static str,
        message: String,
    },
    /// A cached blob could not be encoded or decoded.
    #[error("cache payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TierError {
    pub fn unavailable(tier: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            tier,
            message: message.into(),
        }
    }

    pub fn operation(tier: &'static str, op: &'static str, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            tier,
            op,
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

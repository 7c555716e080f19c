//! Repository traits describing the system of record.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{BannerRecord, BannerSummary};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Read access to canonical banner records.
///
/// A missing record is `Ok(None)`, not an error: the cache must be able to
/// tell "does not exist" apart from "could not ask".
#[async_trait]
pub trait BannerRepo: Send + Sync {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<BannerRecord>, RepoError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BannerRecord>, RepoError>;

    async fn list_lightweight(&self) -> Result<Vec<BannerSummary>, RepoError>;
}

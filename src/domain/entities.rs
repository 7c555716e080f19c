//! Domain entities mirrored from the system of record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Canonical banner record. The cache treats it as an opaque blob and owns
/// no identity beyond its id and slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerRecord {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub updated_at: OffsetDateTime,
}

/// Lightweight projection used for preloading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerSummary {
    pub id: i64,
    pub slug: String,
}

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{BannerRepo, RepoError},
    domain::entities::{BannerRecord, BannerSummary},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct BannerRow {
    id: i64,
    slug: String,
    title: String,
    content: String,
    updated_at: OffsetDateTime,
}

impl From<BannerRow> for BannerRecord {
    fn from(row: BannerRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            content: row.content,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BannerSummaryRow {
    id: i64,
    slug: String,
}

#[async_trait]
impl BannerRepo for PostgresRepositories {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<BannerRecord>, RepoError> {
        let row = sqlx::query_as::<_, BannerRow>(
            "SELECT id, slug, title, content, updated_at FROM banners WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BannerRecord::from))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BannerRecord>, RepoError> {
        let row = sqlx::query_as::<_, BannerRow>(
            "SELECT id, slug, title, content, updated_at FROM banners WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BannerRecord::from))
    }

    async fn list_lightweight(&self) -> Result<Vec<BannerSummary>, RepoError> {
        let rows = sqlx::query_as::<_, BannerSummaryRow>(
            "SELECT id, slug FROM banners ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| BannerSummary {
                id: row.id,
                slug: row.slug,
            })
            .collect())
    }
}

use std::collections::BTreeMap;

use axum::{
    Extension,
    extract::{Path, Query},
    response::Html,
};

use crate::{
    application::error::AppError,
    cache::{BannerSettings, CacheWorker, RequestContext, SettingValue, escape_html},
};

/// Render one banner page. Query parameters become display settings.
pub async fn banner_page(
    Extension(worker): Extension<CacheWorker>,
    Extension(context): Extension<RequestContext>,
    Path(slug): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Html<String>, AppError> {
    let settings: BannerSettings = query
        .iter()
        .map(|(name, value)| (name.clone(), SettingValue::infer(value)))
        .collect();

    let markup = worker
        .banners
        .render_banner(&context, &slug, &settings)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>",
        escape_html(&slug),
        markup
    )))
}

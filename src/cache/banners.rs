//! Banner cache manager: read-through and write-through of single banners.

use std::fmt::Write as _;
use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use super::bypass::{BypassPolicy, RequestContext};
use super::context::CacheContext;
use super::error::TierError;
use super::keys::{BANNER_OBJECT, BannerSettings, CacheKey};
use crate::application::repos::{BannerRepo, RepoError};
use crate::domain::entities::BannerRecord;
use crate::domain::identifier::BannerIdentifier;

const METRIC_STORE_FETCH: &str = "banner_cache_store_fetch_total";
const METRIC_BYPASS: &str = "banner_cache_bypass_total";
const METRIC_PURGE: &str = "banner_cache_purge_total";

/// Outcome of one preload pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// False when the execution context does not allow preloading.
    pub ran: bool,
    pub inspected: usize,
    pub warmed: usize,
    pub already_warm: usize,
    pub missing: usize,
    pub failed: usize,
}

pub struct BannerCache {
    context: Arc<CacheContext>,
    repo: Arc<dyn BannerRepo>,
    policy: BypassPolicy,
}

impl BannerCache {
    pub fn new(context: Arc<CacheContext>, repo: Arc<dyn BannerRepo>) -> Self {
        let policy = BypassPolicy::new(context.config().debug);
        Self {
            context,
            repo,
            policy,
        }
    }

    pub fn context(&self) -> &CacheContext {
        &self.context
    }

    pub fn should_bypass_cache(&self, request: &RequestContext) -> bool {
        self.policy.should_bypass(request)
    }

    /// Fetch a banner, consulting the tiers first.
    ///
    /// A missing banner is returned as `Ok(None)` and never cached.
    #[instrument(skip(self, request, settings), fields(kind = ?request.kind))]
    pub async fn get_banner(
        &self,
        request: &RequestContext,
        slug: &str,
        settings: &BannerSettings,
    ) -> Result<Option<BannerRecord>, RepoError> {
        if self.should_bypass_cache(request) {
            counter!(METRIC_BYPASS).increment(1);
            debug!(slug, "cache bypassed");
            return self.fetch(slug).await;
        }

        let key = self.key(request, slug, settings);
        if let Some(record) = self.read(&key).await {
            return Ok(Some(record));
        }

        let Some(record) = self.fetch(slug).await? else {
            debug!(slug, "banner not found, nothing cached");
            return Ok(None);
        };

        self.write(&key, &record).await;
        Ok(Some(record))
    }

    /// Render a banner to markup, memoizing the result for this worker.
    pub async fn render_banner(
        &self,
        request: &RequestContext,
        slug: &str,
        settings: &BannerSettings,
    ) -> Result<Option<String>, RepoError> {
        if self.should_bypass_cache(request) {
            let record = self.get_banner(request, slug, settings).await?;
            return Ok(record.map(|record| render_markup(&record, settings)));
        }

        let key = self.key(request, slug, settings);
        if let Some(markup) = self.context.memo().get(slug, &key) {
            return Ok(Some(markup));
        }

        let Some(record) = self.get_banner(request, slug, settings).await? else {
            return Ok(None);
        };
        let markup = render_markup(&record, settings);
        self.context.memo().insert(slug, key, markup.clone());
        Ok(Some(markup))
    }

    /// Purge every cached variant of one banner and every rendered page of
    /// it. Returns the slug the identifier resolved to.
    pub async fn clear_object_cache(&self, identifier: &BannerIdentifier) -> String {
        let slug = self.resolve_slug(identifier).await;
        let deriver = self.context.deriver();

        let chain = self.context.chain();
        chain
            .delete_prefix(&deriver.base_prefix(BANNER_OBJECT, &slug))
            .await;
        chain.delete_prefix(&deriver.fragment_prefix(&slug)).await;
        let renders = self.context.memo().remove(&slug);

        counter!(METRIC_PURGE, "scope" => "object").increment(1);
        info!(%identifier, slug = %slug, renders, "banner cache cleared");
        slug
    }

    /// Drop everything this cache owns, in every tier.
    pub async fn clear_all_cache(&self) {
        self.context.chain().flush_all().await;
        self.context.memo().clear();
        counter!(METRIC_PURGE, "scope" => "all").increment(1);
        info!("all banner caches cleared");
    }

    /// Warm every banner missing from both memory and the object cache.
    ///
    /// Does nothing in contexts where no visitor is about to be served.
    pub async fn preload(&self, request: &RequestContext) -> Result<PreloadReport, RepoError> {
        let mut report = PreloadReport::default();
        if !self.policy.allows_preload(request) {
            debug!(kind = ?request.kind, "preload skipped for context");
            return Ok(report);
        }
        report.ran = true;

        let settings = BannerSettings::new();
        for summary in self.repo.list_lightweight().await? {
            report.inspected += 1;
            let key = self.key(request, &summary.slug, &settings);
            if self.context.chain().is_warm(&key).await {
                report.already_warm += 1;
                continue;
            }

            match self.get_banner(request, &summary.slug, &settings).await {
                Ok(Some(_)) => report.warmed += 1,
                Ok(None) => report.missing += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(slug = %summary.slug, error = %err, "banner preload failed");
                }
            }
        }

        info!(
            inspected = report.inspected,
            warmed = report.warmed,
            already_warm = report.already_warm,
            "banner preload finished"
        );
        Ok(report)
    }

    fn key(&self, request: &RequestContext, slug: &str, settings: &BannerSettings) -> CacheKey {
        self.context
            .deriver()
            .derive(BANNER_OBJECT, slug, settings, &request.key_context())
    }

    async fn fetch(&self, slug: &str) -> Result<Option<BannerRecord>, RepoError> {
        counter!(METRIC_STORE_FETCH).increment(1);
        self.repo.get_by_slug(slug).await
    }

    async fn read(&self, key: &CacheKey) -> Option<BannerRecord> {
        let blob = self.context.chain().read(key).await?;
        match serde_json::from_slice::<BannerRecord>(&blob) {
            Ok(record) => Some(record),
            Err(err) => {
                let err = TierError::from(err);
                warn!(key = %key, error = %err, "undecodable cache entry treated as miss");
                None
            }
        }
    }

    async fn write(&self, key: &CacheKey, record: &BannerRecord) {
        let blob = match serde_json::to_vec(record) {
            Ok(blob) => Bytes::from(blob),
            Err(err) => {
                let err = TierError::from(err);
                warn!(key = %key, error = %err, "banner not cached");
                return;
            }
        };
        let ttl = self.context.config().object_ttl();
        self.context.chain().write(key, blob, ttl).await;
    }

    async fn resolve_slug(&self, identifier: &BannerIdentifier) -> String {
        let Some(id) = identifier.id() else {
            return identifier.raw();
        };

        match self.repo.get_by_id(id).await {
            Ok(Some(record)) => record.slug,
            Ok(None) => {
                debug!(id, "banner already gone, purging by raw identifier");
                identifier.raw()
            }
            Err(err) => {
                warn!(id, error = %err, "banner lookup failed, purging by raw identifier");
                identifier.raw()
            }
        }
    }
}

/// Markup for one banner. The content is stored pre-sanitized; the title and
/// setting values are escaped. Settings whose name is not a valid
/// `data-*` suffix are left out.
pub fn render_markup(record: &BannerRecord, settings: &BannerSettings) -> String {
    let mut markup = String::with_capacity(record.content.len() + 128);
    let _ = write!(
        markup,
        r#"<div class="abc-banner" data-banner="{}""#,
        escape_html(&record.slug)
    );
    for (name, value) in settings {
        if !is_data_attribute_name(name) {
            debug!(setting = %name, "setting name not renderable as an attribute");
            continue;
        }
        let _ = write!(
            markup,
            r#" data-{}="{}""#,
            name,
            escape_html(&value.to_string())
        );
    }
    let _ = write!(
        markup,
        r#"><h3 class="abc-banner__title">{}</h3><div class="abc-banner__content">{}</div></div>"#,
        escape_html(&record.title),
        record.content
    );
    markup
}

/// `[a-z0-9_-]+`
fn is_data_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

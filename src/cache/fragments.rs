//! Whole-response caching for requests that target a single resource.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tracing::debug;

use super::bypass::{BypassPolicy, RequestContext};
use super::context::CacheContext;
use super::keys::CacheKey;

const METRIC_FRAGMENT_HIT: &str = "banner_cache_fragment_hit_total";
const METRIC_FRAGMENT_MISS: &str = "banner_cache_fragment_miss_total";

/// Result of the render-start hook.
#[derive(Debug)]
pub enum FragmentLookup {
    /// Caching does not apply; render normally and do not capture.
    Bypass,
    /// Serve this payload as the entire response.
    Hit(Bytes),
    /// Render normally and hand the output to [`PageFragmentCache::maybe_finalize`].
    Miss(FragmentCapture),
}

/// Token tying a render-end call to the key chosen at render start.
#[derive(Debug, Clone)]
pub struct FragmentCapture {
    key: CacheKey,
}

impl FragmentCapture {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

pub struct PageFragmentCache {
    context: Arc<CacheContext>,
    policy: BypassPolicy,
}

impl PageFragmentCache {
    pub fn new(context: Arc<CacheContext>) -> Self {
        let policy = BypassPolicy::new(context.config().debug);
        Self { context, policy }
    }

    /// Render-start hook.
    pub async fn maybe_prime(&self, request: &RequestContext) -> FragmentLookup {
        let Some(key) = self.fragment_key(request) else {
            return FragmentLookup::Bypass;
        };

        match self.context.chain().read(&key).await {
            Some(payload) => {
                counter!(METRIC_FRAGMENT_HIT).increment(1);
                debug!(key = %key, bytes = payload.len(), "fragment served from cache");
                FragmentLookup::Hit(payload)
            }
            None => {
                counter!(METRIC_FRAGMENT_MISS).increment(1);
                FragmentLookup::Miss(FragmentCapture { key })
            }
        }
    }

    /// Render-end hook: store the captured output and hand it back for
    /// emission.
    pub async fn maybe_finalize(
        &self,
        request: &RequestContext,
        capture: FragmentCapture,
        output: Bytes,
    ) -> Bytes {
        if self.fragment_key(request).as_ref() != Some(&capture.key) {
            debug!(key = %capture.key, "request changed since render start, not caching");
            return output;
        }

        let ttl = self.context.config().fragment_ttl();
        self.context
            .chain()
            .write(&capture.key, output.clone(), ttl)
            .await;
        debug!(key = %capture.key, bytes = output.len(), "fragment cached");
        output
    }

    fn fragment_key(&self, request: &RequestContext) -> Option<CacheKey> {
        if self.policy.should_bypass(request) {
            return None;
        }
        let resource = request.resource.as_deref()?;
        Some(self.context.deriver().fragment(resource, &request.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::bypass::ContextKind;
    use crate::cache::config::CacheConfig;
    use crate::cache::context::CacheBackends;

    fn fragments(config: CacheConfig) -> PageFragmentCache {
        PageFragmentCache::new(Arc::new(CacheContext::init(&CacheBackends::new(config))))
    }

    fn singular(path: &str) -> RequestContext {
        RequestContext::frontend(path).with_resource("summer-sale")
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = fragments(CacheConfig::default());
        let request = singular("/banners/summer-sale");

        let FragmentLookup::Miss(capture) = cache.maybe_prime(&request).await else {
            panic!("expected a miss on a cold cache");
        };
        let emitted = cache
            .maybe_finalize(&request, capture, Bytes::from_static(b"<html>"))
            .await;
        assert_eq!(emitted, Bytes::from_static(b"<html>"));

        match cache.maybe_prime(&singular("/banners//summer-sale/")).await {
            FragmentLookup::Hit(payload) => assert_eq!(payload, Bytes::from_static(b"<html>")),
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_pages_are_not_cached() {
        let cache = fragments(CacheConfig::default());
        assert!(matches!(
            cache.maybe_prime(&RequestContext::frontend("/banners")).await,
            FragmentLookup::Bypass
        ));
    }

    #[tokio::test]
    async fn admin_and_debug_bypass() {
        let cache = fragments(CacheConfig::default());
        let admin = RequestContext::new(ContextKind::Admin).with_resource("summer-sale");
        assert!(matches!(cache.maybe_prime(&admin).await, FragmentLookup::Bypass));

        let debug = fragments(CacheConfig {
            debug: true,
            ..Default::default()
        });
        assert!(matches!(
            debug.maybe_prime(&singular("/")).await,
            FragmentLookup::Bypass
        ));
    }
}

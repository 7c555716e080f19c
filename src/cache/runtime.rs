//! Wiring of the cache components for one process and its workers.

use std::sync::Arc;

use super::banners::BannerCache;
use super::context::{CacheBackends, CacheContext};
use super::coordinator::InvalidationCoordinator;
use super::events::EventBus;
use super::fragments::PageFragmentCache;
use crate::application::repos::BannerRepo;

/// Process-level handle: shared backends plus the system of record.
#[derive(Clone)]
pub struct CacheRuntime {
    backends: CacheBackends,
    repo: Arc<dyn BannerRepo>,
}

impl CacheRuntime {
    pub fn new(backends: CacheBackends, repo: Arc<dyn BannerRepo>) -> Self {
        Self { backends, repo }
    }

    pub fn backends(&self) -> &CacheBackends {
        &self.backends
    }

    pub fn repo(&self) -> Arc<dyn BannerRepo> {
        self.repo.clone()
    }

    /// Build a worker with its own memory tier and an event bus that already
    /// has the invalidation coordinator subscribed.
    pub fn worker(&self) -> CacheWorker {
        let context = Arc::new(CacheContext::init(&self.backends));
        let banners = Arc::new(BannerCache::new(context.clone(), self.repo.clone()));
        let fragments = Arc::new(PageFragmentCache::new(context.clone()));
        let events = Arc::new(EventBus::new());
        Arc::new(InvalidationCoordinator::new(banners.clone())).register(&events);

        CacheWorker {
            context,
            banners,
            fragments,
            events,
        }
    }
}

/// Everything one worker uses to serve requests.
#[derive(Clone)]
pub struct CacheWorker {
    pub context: Arc<CacheContext>,
    pub banners: Arc<BannerCache>,
    pub fragments: Arc<PageFragmentCache>,
    pub events: Arc<EventBus>,
}

impl CacheWorker {
    pub fn teardown(&self) {
        self.context.teardown();
    }
}

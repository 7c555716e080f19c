//! Invalidation coordinator: turns lifecycle events into purges.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::banners::BannerCache;
use super::events::{CacheEvent, EventBus, EventHandler, LifecycleEvent};
use crate::domain::identifier::BannerIdentifier;

pub struct InvalidationCoordinator {
    banners: Arc<BannerCache>,
    media_meta_key: String,
}

impl InvalidationCoordinator {
    pub fn new(banners: Arc<BannerCache>) -> Self {
        let media_meta_key = banners.context().config().media_meta_key.clone();
        Self {
            banners,
            media_meta_key,
        }
    }

    pub fn register(self: Arc<Self>, bus: &EventBus) {
        bus.subscribe(self);
    }

    async fn on_media_changed(&self, owner_id: i64, meta_key: &str) {
        if meta_key != self.media_meta_key {
            debug!(owner_id, meta_key, "metadata change ignored");
            return;
        }
        self.banners.clear_all_cache().await;
    }
}

#[async_trait]
impl EventHandler for InvalidationCoordinator {
    fn name(&self) -> &'static str {
        "invalidation_coordinator"
    }

    async fn handle(&self, event: &CacheEvent) {
        match &event.kind {
            LifecycleEvent::ObjectUpdated { identifier }
            | LifecycleEvent::ObjectDeleted { identifier } => {
                self.banners
                    .clear_object_cache(&BannerIdentifier::parse(identifier))
                    .await;
            }
            LifecycleEvent::RelatedMediaChanged {
                owner_id, meta_key, ..
            } => self.on_media_changed(*owner_id, meta_key).await,
            LifecycleEvent::GlobalSettingsChanged => self.banners.clear_all_cache().await,
            LifecycleEvent::ContextStarted { context } => {
                if let Err(err) = self.banners.preload(context).await {
                    warn!(event_id = %event.id, error = %err, "banner preload aborted");
                }
            }
        }
    }
}

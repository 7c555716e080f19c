//! Lifecycle events and the bus that dispatches them.
//!
//! The host publishes events; subscribers (the invalidation coordinator in
//! particular) register once and are called in subscription order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::bypass::RequestContext;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::events";
const METRIC_DISPATCH_MS: &str = "banner_cache_event_dispatch_ms";

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

/// Domain signals that affect cached content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A banner was created or edited. `identifier` is an id or a slug.
    ObjectUpdated { identifier: String },
    ObjectDeleted { identifier: String },
    /// A metadata entry of some owner object was added, changed or removed.
    RelatedMediaChanged {
        owner_id: i64,
        meta_key: String,
        #[serde(default)]
        meta_value: Option<String>,
    },
    GlobalSettingsChanged,
    /// An execution context began.
    ContextStarted {
        #[serde(default)]
        context: RequestContext,
    },
}

impl LifecycleEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ObjectUpdated { .. } => "object_updated",
            Self::ObjectDeleted { .. } => "object_deleted",
            Self::RelatedMediaChanged { .. } => "related_media_changed",
            Self::GlobalSettingsChanged => "global_settings_changed",
            Self::ContextStarted { .. } => "context_started",
        }
    }
}

/// Envelope carrying one event through the bus.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Unique identifier for idempotency (UUIDv4).
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: LifecycleEvent,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: LifecycleEvent, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// A subscriber. Handlers own their failure handling; nothing is returned to
/// the publisher.
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &CacheEvent);
}

/// Explicit-subscription event bus owned by the host.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
    epoch_counter: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        debug!(handler = handler.name(), "event handler subscribed");
        rw_write(&self.handlers, SOURCE, "subscribe").push(handler);
    }

    pub fn subscriber_count(&self) -> usize {
        rw_read(&self.handlers, SOURCE, "subscriber_count").len()
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Dispatch `kind` to every subscriber and return the delivered envelope.
    pub async fn publish(&self, kind: LifecycleEvent) -> CacheEvent {
        let event = CacheEvent::new(kind, self.next_epoch());
        let handlers: Vec<Arc<dyn EventHandler>> =
            rw_read(&self.handlers, SOURCE, "publish").clone();

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind.label(),
            handlers = handlers.len(),
            "Lifecycle event published"
        );

        let started = Instant::now();
        for handler in &handlers {
            handler.handle(&event).await;
        }
        histogram!(METRIC_DISPATCH_MS, "event" => event.kind.label())
            .record(started.elapsed().as_secs_f64() * 1000.0);

        event
    }

    pub async fn object_updated(&self, identifier: impl Into<String>) -> CacheEvent {
        self.publish(LifecycleEvent::ObjectUpdated {
            identifier: identifier.into(),
        })
        .await
    }

    pub async fn object_deleted(&self, identifier: impl Into<String>) -> CacheEvent {
        self.publish(LifecycleEvent::ObjectDeleted {
            identifier: identifier.into(),
        })
        .await
    }

    pub async fn related_media_changed(
        &self,
        owner_id: i64,
        meta_key: impl Into<String>,
        meta_value: Option<String>,
    ) -> CacheEvent {
        self.publish(LifecycleEvent::RelatedMediaChanged {
            owner_id,
            meta_key: meta_key.into(),
            meta_value,
        })
        .await
    }

    pub async fn global_settings_changed(&self) -> CacheEvent {
        self.publish(LifecycleEvent::GlobalSettingsChanged).await
    }

    pub async fn context_started(&self, context: RequestContext) -> CacheEvent {
        self.publish(LifecycleEvent::ContextStarted { context }).await
    }
}

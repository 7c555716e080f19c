//! Multi-tier banner cache.
//!
//! Reads cascade through progressively slower tiers and back-fill the
//! per-worker memory tier on the way up:
//!
//! - **memory**: per worker, never shared, no TTL
//! - **object**: process-wide grouped key/value service
//! - **distributed**: optional Redis-like store, disabled for good on the
//!   first connectivity failure
//! - **fallback**: durable table, read only when neither shared tier exists
//!
//! Writes fan out to every configured tier on a best-effort basis. Lifecycle
//! events published on the [`EventBus`] drive invalidation.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! namespace = "abc"
//! object_ttl_seconds = 43200
//! fragment_ttl_seconds = 10800
//! # ... see config.rs for all options
//! ```

mod banners;
mod bypass;
mod chain;
mod config;
mod context;
mod coordinator;
mod error;
mod events;
mod fragments;
mod keys;
mod lock;
mod memo;
mod middleware;
mod runtime;
mod tier;

pub use banners::{BannerCache, PreloadReport, render_markup};
pub(crate) use banners::escape_html;
pub use bypass::{BypassPolicy, ContextKind, RequestContext};
pub use chain::TierChain;
pub use config::CacheConfig;
pub(crate) use config::{
    DEFAULT_FRAGMENT_TTL_SECS, DEFAULT_MEDIA_META_KEY, DEFAULT_NAMESPACE,
    DEFAULT_OBJECT_CACHE_LIMIT, DEFAULT_OBJECT_TTL_SECS, MAX_TTL_SECS,
};
pub use context::{CacheBackends, CacheContext};
pub use coordinator::InvalidationCoordinator;
pub use error::TierError;
pub use events::{CacheEvent, Epoch, EventBus, EventHandler, LifecycleEvent};
pub use fragments::{FragmentCapture, FragmentLookup, PageFragmentCache};
pub use keys::{
    BANNER_OBJECT, BannerSettings, CacheKey, KeyContext, KeyDeriver, SettingValue,
    normalize_request_path,
};
pub use memo::RenderMemo;
pub use middleware::{CACHE_STATUS_HEADER, fragment_cache_layer};
pub use runtime::{CacheRuntime, CacheWorker};
pub use tier::{
    CacheTier, DistributedStore, DistributedTier, FallbackTable, FallbackTier, LocalObjectCache,
    MemoryTier, ObjectCacheService, ObjectCacheTier, escape_like,
};

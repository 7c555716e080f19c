//! Process-shared backends and the per-worker cache context built on them.

use std::sync::Arc;

use tracing::{debug, info};

use super::chain::TierChain;
use super::config::CacheConfig;
use super::keys::KeyDeriver;
use super::memo::RenderMemo;
use super::tier::{
    CacheTier, DistributedStore, DistributedTier, FallbackTable, FallbackTier,
    ObjectCacheService, ObjectCacheTier,
};

/// Shared tiers, wired once per process and cloned into every worker.
///
/// Each optional tier is absent unless its backend was supplied and the
/// matching `enable_*` switch allows it.
#[derive(Clone)]
pub struct CacheBackends {
    config: Arc<CacheConfig>,
    object: Option<Arc<dyn CacheTier>>,
    distributed: Option<Arc<DistributedTier>>,
    fallback: Option<Arc<dyn CacheTier>>,
}

impl CacheBackends {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: Arc::new(config),
            object: None,
            distributed: None,
            fallback: None,
        }
    }

    pub fn with_object_cache(mut self, service: Arc<dyn ObjectCacheService>) -> Self {
        self.object = Some(Arc::new(ObjectCacheTier::new(
            service,
            self.config.group(),
        )));
        self
    }

    pub fn with_distributed(mut self, store: Arc<dyn DistributedStore>) -> Self {
        if !self.config.enable_distributed {
            info!("distributed cache disabled by configuration");
            return self;
        }
        self.distributed = Some(Arc::new(DistributedTier::new(
            store,
            self.config.namespace_prefix(),
        )));
        self
    }

    pub fn with_fallback(mut self, table: Arc<dyn FallbackTable>) -> Self {
        if !self.config.enable_fallback {
            info!("fallback cache table disabled by configuration");
            return self;
        }
        self.fallback = Some(Arc::new(FallbackTier::new(
            table,
            self.config.namespace_prefix(),
        )));
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn object(&self) -> Option<Arc<dyn CacheTier>> {
        self.object.clone()
    }

    pub fn distributed(&self) -> Option<Arc<dyn CacheTier>> {
        self.distributed
            .clone()
            .map(|tier| tier as Arc<dyn CacheTier>)
    }

    pub fn fallback(&self) -> Option<Arc<dyn CacheTier>> {
        self.fallback.clone()
    }

    /// True once the distributed store has failed and been switched off.
    pub fn distributed_degraded(&self) -> bool {
        self.distributed
            .as_ref()
            .is_some_and(|tier| tier.is_degraded())
    }

    /// Names of the tiers that participate, in read order.
    pub fn active_tiers(&self) -> Vec<&'static str> {
        let mut tiers = vec!["memory"];
        if self.object.is_some() {
            tiers.push("object");
        }
        if self.distributed.is_some() {
            tiers.push("distributed");
        }
        if self.fallback.is_some() {
            tiers.push("fallback");
        }
        tiers
    }
}

/// State owned by one worker: its memory tier, render memo and key deriver.
///
/// Created at worker start, torn down at worker end; nothing here outlives
/// the worker.
pub struct CacheContext {
    config: Arc<CacheConfig>,
    deriver: KeyDeriver,
    chain: TierChain,
    memo: RenderMemo,
}

impl CacheContext {
    pub fn init(backends: &CacheBackends) -> Self {
        debug!(tiers = ?backends.active_tiers(), "cache context initialized");
        Self {
            config: backends.config.clone(),
            deriver: KeyDeriver::new(&backends.config),
            chain: TierChain::new(backends),
            memo: RenderMemo::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    pub fn chain(&self) -> &TierChain {
        &self.chain
    }

    pub fn memo(&self) -> &RenderMemo {
        &self.memo
    }

    /// Drop every worker-local entry.
    pub fn teardown(&self) {
        let entries = self.chain.memory().len();
        self.chain.memory().clear();
        self.memo.clear();
        debug!(memory_entries = entries, "cache context torn down");
    }
}

//! Cache configuration.
//!
//! Controls TTLs, key namespacing and which optional tiers participate,
//! via the `[cache]` section of `banner-cache.toml`.

use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
pub(crate) const DEFAULT_NAMESPACE: &str = "abc";
pub(crate) const DEFAULT_OBJECT_TTL_SECS: u64 = 12 * 60 * 60;
pub(crate) const DEFAULT_FRAGMENT_TTL_SECS: u64 = 3 * 60 * 60;
pub(crate) const DEFAULT_OBJECT_CACHE_LIMIT: usize = 2048;
pub(crate) const DEFAULT_MEDIA_META_KEY: &str = "_wp_attachment_metadata";
/// Longest TTL any tier is asked to honor.
pub(crate) const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Cache configuration from `banner-cache.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Leading tag of every key; also the unit of a full flush.
    pub namespace: String,
    /// Suffix of every key. Bumping it orphans all previously written keys.
    pub schema_version: String,
    /// TTL for banner objects in the shared tiers.
    pub object_ttl_seconds: u64,
    /// TTL for rendered page fragments; shorter than the object TTL.
    pub fragment_ttl_seconds: u64,
    /// Entry cap for the in-process object cache.
    pub object_cache_limit: usize,
    /// Debug mode forces every read to bypass the cache.
    pub debug: bool,
    /// Metadata key whose changes flush everything.
    pub media_meta_key: String,
    /// Use the distributed store when one is configured.
    pub enable_distributed: bool,
    /// Use the persistent fallback table when one is configured.
    pub enable_fallback: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            schema_version: env!("CARGO_PKG_VERSION").to_string(),
            object_ttl_seconds: DEFAULT_OBJECT_TTL_SECS,
            fragment_ttl_seconds: DEFAULT_FRAGMENT_TTL_SECS,
            object_cache_limit: DEFAULT_OBJECT_CACHE_LIMIT,
            debug: false,
            media_meta_key: DEFAULT_MEDIA_META_KEY.to_string(),
            enable_distributed: true,
            enable_fallback: true,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            namespace: settings.namespace.clone(),
            schema_version: settings.schema_version.clone(),
            object_ttl_seconds: settings.object_ttl.as_secs(),
            fragment_ttl_seconds: settings.fragment_ttl.as_secs(),
            object_cache_limit: settings.object_cache_limit.get(),
            debug: settings.debug,
            media_meta_key: settings.media_meta_key.clone(),
            enable_distributed: settings.enable_distributed,
            enable_fallback: settings.enable_fallback,
        }
    }
}

impl CacheConfig {
    pub fn object_ttl(&self) -> Duration {
        Duration::from_secs(self.object_ttl_seconds.min(MAX_TTL_SECS))
    }

    pub fn fragment_ttl(&self) -> Duration {
        Duration::from_secs(self.fragment_ttl_seconds.min(MAX_TTL_SECS))
    }

    /// Object-cache group holding every entry of this namespace.
    pub fn group(&self) -> String {
        format!("{}_banners", self.namespace)
    }

    /// Prefix shared by every key this cache writes.
    pub fn namespace_prefix(&self) -> String {
        format!("{}_", self.namespace)
    }

    /// Version tag appended to keys, restricted to `[a-z0-9_]`.
    pub fn version_tag(&self) -> String {
        let sanitized: String = self
            .schema_version
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("v{sanitized}")
    }
}

//! Cache key derivation.
//!
//! Keys are a pure function of the object type, identifier, sorted settings,
//! locale, viewer and schema version. Shape:
//!
//! ```text
//! {namespace}_{base digest}_{variant digest}_{version tag}
//! ```
//!
//! The base digest only covers `(object_type, identifier)`, so every variant
//! of one object (settings, locale, viewer) shares the prefix returned by
//! [`KeyDeriver::base_prefix`] and can be purged together.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::config::CacheConfig;

const PART_SEPARATOR: &str = "\u{1f}";
const BASE_DIGEST_LEN: usize = 16;
const VARIANT_DIGEST_LEN: usize = 32;
const FRAGMENT_TAG: &str = "page";

/// Object type tag for banners.
pub const BANNER_OBJECT: &str = "banner";

/// Scalar value of a display setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SettingValue {
    /// Type a free-form value: booleans and integers are recognized, anything
    /// else stays text.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("1"),
            Self::Bool(false) => f.write_str("0"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Display settings of a banner request. Ordered, so insertion order never
/// leaks into the key.
pub type BannerSettings = BTreeMap<String, SettingValue>;

/// Ambient request inputs that vary the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyContext {
    pub locale: Option<String>,
    /// Identified viewers get their own entries; anonymous viewers share one.
    pub viewer_id: Option<u64>,
}

/// Opaque, storage-safe cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds keys for one namespace and schema version.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    namespace: String,
    version: String,
}

impl KeyDeriver {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            version: config.version_tag(),
        }
    }

    /// Derive the key for one variant of an object.
    pub fn derive(
        &self,
        object_type: &str,
        identifier: &str,
        settings: &BannerSettings,
        context: &KeyContext,
    ) -> CacheKey {
        let mut parts = vec![object_type.to_string(), identifier.to_string()];

        for (name, value) in settings {
            parts.push(format!("{name}_{value}"));
        }

        if let Some(locale) = context.locale.as_deref() {
            parts.push(format!("lang_{locale}"));
        }

        if let Some(viewer_id) = context.viewer_id {
            parts.push(format!("user_{viewer_id}"));
        }

        let variant = digest(&parts.join(PART_SEPARATOR), VARIANT_DIGEST_LEN);
        CacheKey(format!(
            "{}{}_{}",
            self.base_prefix(object_type, identifier),
            variant,
            self.version
        ))
    }

    /// Prefix shared by every variant of `(object_type, identifier)`.
    pub fn base_prefix(&self, object_type: &str, identifier: &str) -> String {
        let base = digest(
            &[object_type, identifier].join(PART_SEPARATOR),
            BASE_DIGEST_LEN,
        );
        format!("{}_{}_", self.namespace, base)
    }

    /// Key for a rendered fragment of `resource` served at `request_path`.
    pub fn fragment(&self, resource: &str, request_path: &str) -> CacheKey {
        let normalized = normalize_request_path(request_path);
        CacheKey(format!(
            "{}{}_{}",
            self.fragment_prefix(resource),
            digest(&normalized, VARIANT_DIGEST_LEN),
            self.version
        ))
    }

    /// Prefix shared by every rendered fragment of `resource`.
    pub fn fragment_prefix(&self, resource: &str) -> String {
        format!(
            "{}_{}_{}_",
            self.namespace,
            FRAGMENT_TAG,
            digest(resource, BASE_DIGEST_LEN)
        )
    }

    /// Prefix shared by every key of this namespace.
    pub fn namespace_prefix(&self) -> String {
        format!("{}_", self.namespace)
    }
}

/// Collapse repeated slashes and drop a trailing slash; the query string is
/// kept verbatim because it can change the rendered output.
pub fn normalize_request_path(path_and_query: &str) -> String {
    let (path, query) = match path_and_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_and_query, None),
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut normalized = format!("/{}", segments.join("/"));

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        normalized.push('?');
        normalized.push_str(query);
    }

    normalized
}

fn digest(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let mut encoded = hex::encode(hasher.finalize());
    encoded.truncate(len);
    encoded
}

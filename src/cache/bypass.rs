//! Execution context and the bypass policy derived from it.

use serde::{Deserialize, Serialize};

use super::keys::KeyContext;

/// Who is being served by the current execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// A visitor-facing page render.
    #[default]
    Frontend,
    /// Administrative panel.
    Admin,
    /// Automated/programmatic request (XHR, webhooks, API calls).
    Programmatic,
    /// Command-line invocation.
    Cli,
    /// Scheduled or queued background job.
    Background,
}

/// Ambient inputs of one execution context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub kind: ContextKind,
    #[serde(default)]
    pub locale: Option<String>,
    /// Identified viewer, `None` for anonymous visitors.
    #[serde(default)]
    pub viewer_id: Option<u64>,
    /// Set when the request targets a single addressable resource.
    #[serde(default)]
    pub resource: Option<String>,
    /// Request path including the query string.
    #[serde(default)]
    pub path: String,
}

impl RequestContext {
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            path: "/".to_string(),
            ..Default::default()
        }
    }

    pub fn frontend(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::new(ContextKind::Frontend)
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_viewer(mut self, viewer_id: u64) -> Self {
        self.viewer_id = Some(viewer_id);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Whether the request addresses exactly one resource.
    pub fn is_singular(&self) -> bool {
        self.resource.is_some()
    }

    pub fn key_context(&self) -> KeyContext {
        KeyContext {
            locale: self.locale.clone(),
            viewer_id: self.viewer_id,
        }
    }
}

/// Decides when caching is skipped entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct BypassPolicy {
    debug: bool,
}

impl BypassPolicy {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// True in debug mode and for every context that is not a visitor-facing
    /// render.
    pub fn should_bypass(&self, context: &RequestContext) -> bool {
        self.debug || context.kind != ContextKind::Frontend
    }

    /// Preloading only pays off when a visitor is about to be served.
    pub fn allows_preload(&self, context: &RequestContext) -> bool {
        !self.should_bypass(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_is_cached() {
        let policy = BypassPolicy::new(false);
        assert!(!policy.should_bypass(&RequestContext::frontend("/")));
        assert!(policy.allows_preload(&RequestContext::frontend("/")));
    }

    #[test]
    fn non_visitor_contexts_bypass() {
        let policy = BypassPolicy::new(false);
        for kind in [
            ContextKind::Admin,
            ContextKind::Programmatic,
            ContextKind::Cli,
            ContextKind::Background,
        ] {
            let context = RequestContext::new(kind);
            assert!(policy.should_bypass(&context), "{kind:?} should bypass");
            assert!(!policy.allows_preload(&context), "{kind:?} should not preload");
        }
    }

    #[test]
    fn debug_mode_bypasses_everything() {
        let policy = BypassPolicy::new(true);
        assert!(policy.should_bypass(&RequestContext::frontend("/")));
    }

    #[test]
    fn key_context_carries_locale_and_viewer() {
        let context = RequestContext::frontend("/")
            .with_locale("en_US")
            .with_viewer(9);
        let key_context = context.key_context();
        assert_eq!(key_context.locale.as_deref(), Some("en_US"));
        assert_eq!(key_context.viewer_id, Some(9));
    }

    #[test]
    fn deserializes_with_defaults() {
        let context: RequestContext =
            serde_json::from_str(r#"{"kind":"frontend","resource":"summer-sale"}"#)
                .expect("context json");
        assert!(context.is_singular());
        assert_eq!(context.locale, None);
    }
}

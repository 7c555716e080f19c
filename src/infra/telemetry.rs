use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "banner_cache_tier_hit_total",
            Unit::Count,
            "Cache hits, labelled by the tier that answered."
        );
        describe_counter!(
            "banner_cache_tier_miss_total",
            Unit::Count,
            "Reads that missed every tier."
        );
        describe_counter!(
            "banner_cache_tier_error_total",
            Unit::Count,
            "Swallowed tier failures, labelled by tier and operation."
        );
        describe_counter!(
            "banner_cache_object_evict_total",
            Unit::Count,
            "In-process object cache evictions due to capacity."
        );
        describe_counter!(
            "banner_cache_store_fetch_total",
            Unit::Count,
            "Reads served by the system of record."
        );
        describe_counter!(
            "banner_cache_bypass_total",
            Unit::Count,
            "Banner reads that skipped the cache."
        );
        describe_counter!(
            "banner_cache_fragment_hit_total",
            Unit::Count,
            "Responses served from the fragment cache."
        );
        describe_counter!(
            "banner_cache_fragment_miss_total",
            Unit::Count,
            "Fragment-eligible responses that had to be rendered."
        );
        describe_counter!(
            "banner_cache_purge_total",
            Unit::Count,
            "Invalidations, labelled by scope (object or all)."
        );
        describe_histogram!(
            "banner_cache_event_dispatch_ms",
            Unit::Milliseconds,
            "Lifecycle event dispatch latency in milliseconds."
        );
    });
}

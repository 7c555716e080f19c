mod common;

use std::sync::Arc;

use banner_cache::cache::{
    BannerSettings, CacheBackends, CacheConfig, ContextKind, DistributedStore, ObjectCacheService,
    RequestContext, SettingValue,
};
use common::{CountingRepo, MemoryStore, MemoryTable, UnreachableStore, banner, runtime};

fn frontend() -> RequestContext {
    RequestContext::frontend("/")
}

fn no_settings() -> BannerSettings {
    BannerSettings::new()
}

#[tokio::test]
async fn second_read_in_a_worker_is_served_from_memory() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let worker = runtime(common::memory_only(), repo.clone()).worker();

    let first = worker
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("first read")
        .expect("banner exists");
    let second = worker
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("second read")
        .expect("banner exists");

    assert_eq!(first, second);
    assert_eq!(repo.slug_calls(), 1);
}

#[tokio::test]
async fn memory_tier_does_not_outlive_its_worker() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let runtime = runtime(common::memory_only(), repo.clone());

    let first = runtime.worker();
    first
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read");
    first.teardown();

    runtime
        .worker()
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read");

    assert_eq!(repo.slug_calls(), 2);
}

#[tokio::test]
async fn object_cache_is_shared_between_workers() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let object = common::object_cache();
    let backends = common::memory_only().with_object_cache(object.clone());
    let runtime = runtime(backends, repo.clone());

    for _ in 0..3 {
        runtime
            .worker()
            .banners
            .get_banner(&frontend(), "summer-sale", &no_settings())
            .await
            .expect("read")
            .expect("banner exists");
    }

    assert_eq!(repo.slug_calls(), 1);
    assert_eq!(object.len(), 1);
}

#[tokio::test]
async fn bypassed_contexts_always_ask_the_store_and_cache_nothing() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let object = common::object_cache();
    let backends = common::memory_only().with_object_cache(object.clone());
    let worker = runtime(backends, repo.clone()).worker();

    for kind in [ContextKind::Admin, ContextKind::Programmatic, ContextKind::Cli] {
        let record = worker
            .banners
            .get_banner(&RequestContext::new(kind), "summer-sale", &no_settings())
            .await
            .expect("read");
        assert!(record.is_some());
    }

    assert_eq!(repo.slug_calls(), 3);
    assert!(object.is_empty());
    assert!(worker.context.chain().memory().is_empty());
}

#[tokio::test]
async fn debug_mode_bypasses_frontend_reads() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let config = CacheConfig {
        debug: true,
        ..CacheConfig::default()
    };
    let worker = runtime(CacheBackends::new(config), repo.clone()).worker();

    for _ in 0..2 {
        worker
            .banners
            .get_banner(&frontend(), "summer-sale", &no_settings())
            .await
            .expect("read");
    }

    assert_eq!(repo.slug_calls(), 2);
}

#[tokio::test]
async fn missing_banners_are_not_cached() {
    let repo = CountingRepo::with([]);
    let worker = runtime(common::memory_only(), repo.clone()).worker();

    for _ in 0..2 {
        let record = worker
            .banners
            .get_banner(&frontend(), "nope", &no_settings())
            .await
            .expect("read");
        assert!(record.is_none());
    }

    assert_eq!(repo.slug_calls(), 2);
}

#[tokio::test]
async fn settings_and_viewer_select_distinct_variants() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let worker = runtime(common::memory_only(), repo.clone()).worker();

    let mut compact = BannerSettings::new();
    compact.insert("compact".to_string(), SettingValue::Bool(true));

    let plain = no_settings();
    let visitor = frontend();
    let member = frontend().with_viewer(7);

    for (request, settings) in [
        (&visitor, &plain),
        (&visitor, &compact),
        (&member, &plain),
        (&visitor, &plain),
        (&member, &plain),
    ] {
        worker
            .banners
            .get_banner(request, "summer-sale", settings)
            .await
            .expect("read");
    }

    assert_eq!(repo.slug_calls(), 3);
}

#[tokio::test]
async fn clear_all_cache_forces_a_refetch() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let object = common::object_cache();
    let backends = common::memory_only().with_object_cache(object.clone());
    let worker = runtime(backends, repo.clone()).worker();

    worker
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read");
    worker.banners.clear_all_cache().await;
    assert!(object.is_empty());

    worker
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read");

    assert_eq!(repo.slug_calls(), 2);
}

#[tokio::test]
async fn unreachable_distributed_store_degrades_silently() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let store = Arc::new(UnreachableStore::default());
    let backends = common::memory_only().with_distributed(store.clone());
    let runtime = runtime(backends, repo.clone());

    for _ in 0..3 {
        let record = runtime
            .worker()
            .banners
            .get_banner(&frontend(), "summer-sale", &no_settings())
            .await
            .expect("tier failures never reach the caller");
        assert!(record.is_some());
    }

    assert!(runtime.backends().distributed_degraded());
    assert_eq!(store.calls(), 1, "a degraded store is never retried");
    assert_eq!(repo.slug_calls(), 3);
}

#[tokio::test]
async fn distributed_disabled_by_configuration() {
    let config = CacheConfig {
        enable_distributed: false,
        ..CacheConfig::default()
    };
    let backends = CacheBackends::new(config).with_distributed(Arc::new(MemoryStore::default()));

    assert_eq!(backends.active_tiers(), vec!["memory"]);
}

#[tokio::test]
async fn distributed_hit_does_not_backfill_the_object_cache() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let object = common::object_cache();
    let store = Arc::new(MemoryStore::default());
    let backends = common::memory_only()
        .with_object_cache(object.clone())
        .with_distributed(store.clone());
    let runtime = runtime(backends, repo.clone());

    runtime
        .worker()
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read");
    assert_eq!(object.len(), 1);
    assert_eq!(store.len(), 1);

    object.flush_all().await.expect("flush object cache");

    let worker = runtime.worker();
    worker
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read")
        .expect("served from the distributed store");

    assert_eq!(repo.slug_calls(), 1);
    assert!(object.is_empty());
    assert_eq!(worker.context.chain().memory().len(), 1);
}

#[tokio::test]
async fn fallback_table_is_skipped_when_a_faster_shared_tier_exists() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let store = Arc::new(MemoryStore::default());
    let table = Arc::new(MemoryTable::default());
    let backends = common::memory_only()
        .with_distributed(store.clone())
        .with_fallback(table.clone());
    let runtime = runtime(backends, repo.clone());

    runtime
        .worker()
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read");
    assert_eq!(table.len(), 1, "writes still reach the durable table");

    let keys = store.keys("*").await.expect("keys");
    store.del(&keys).await.expect("del");

    runtime
        .worker()
        .banners
        .get_banner(&frontend(), "summer-sale", &no_settings())
        .await
        .expect("read");

    assert_eq!(table.gets(), 0);
    assert_eq!(repo.slug_calls(), 2);
}

#[tokio::test]
async fn fallback_table_serves_reads_when_it_is_the_only_shared_tier() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let table = Arc::new(MemoryTable::default());
    let backends = common::memory_only().with_fallback(table.clone());
    let runtime = runtime(backends, repo.clone());

    for _ in 0..2 {
        runtime
            .worker()
            .banners
            .get_banner(&frontend(), "summer-sale", &no_settings())
            .await
            .expect("read")
            .expect("banner exists");
    }

    assert_eq!(repo.slug_calls(), 1);
    assert_eq!(table.gets(), 2);
}

#[tokio::test]
async fn rendered_markup_is_memoized_per_worker() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let worker = runtime(common::memory_only(), repo.clone()).worker();

    let mut settings = BannerSettings::new();
    settings.insert("theme".to_string(), SettingValue::Text("dark".to_string()));

    let first = worker
        .banners
        .render_banner(&frontend(), "summer-sale", &settings)
        .await
        .expect("render")
        .expect("banner exists");
    let second = worker
        .banners
        .render_banner(&frontend(), "summer-sale", &settings)
        .await
        .expect("render")
        .expect("banner exists");

    assert_eq!(first, second);
    assert!(first.contains(r#"data-banner="summer-sale""#));
    assert!(first.contains(r#"data-theme="dark""#));
    assert_eq!(worker.context.memo().len(), 1);
    assert_eq!(repo.slug_calls(), 1);
}

#[tokio::test]
async fn preload_warms_every_cold_banner() {
    let repo = CountingRepo::with([banner(1, "summer-sale"), banner(2, "winter-sale")]);
    let object = common::object_cache();
    let backends = common::memory_only().with_object_cache(object.clone());
    let runtime = runtime(backends, repo.clone());

    let first = runtime
        .worker()
        .banners
        .preload(&frontend())
        .await
        .expect("preload");
    assert!(first.ran);
    assert_eq!(first.inspected, 2);
    assert_eq!(first.warmed, 2);

    let second = runtime
        .worker()
        .banners
        .preload(&frontend())
        .await
        .expect("preload");
    assert_eq!(second.already_warm, 2);
    assert_eq!(second.warmed, 0);
    assert_eq!(repo.slug_calls(), 2);
}

#[tokio::test]
async fn preload_does_nothing_outside_visitor_contexts() {
    let repo = CountingRepo::with([banner(1, "summer-sale")]);
    let worker = runtime(common::memory_only(), repo.clone()).worker();

    let report = worker
        .banners
        .preload(&RequestContext::new(ContextKind::Admin))
        .await
        .expect("preload");

    assert!(!report.ran);
    assert_eq!(repo.slug_calls(), 0);
}

mod common;

use std::sync::Arc;

use banner_cache::cache::{
    BANNER_OBJECT, BannerSettings, CacheConfig, CacheRuntime, CacheWorker, ContextKind,
    LifecycleEvent, RequestContext,
};
use common::{CountingRepo, MemoryStore, banner};

struct Fixture {
    repo: Arc<CountingRepo>,
    store: Arc<MemoryStore>,
    runtime: CacheRuntime,
}

fn fixture() -> Fixture {
    let repo = CountingRepo::with([banner(42, "summer-sale"), banner(43, "winter-sale")]);
    let store = Arc::new(MemoryStore::default());
    let backends = common::memory_only().with_distributed(store.clone());
    let runtime = common::runtime(backends, repo.clone());
    Fixture {
        repo,
        store,
        runtime,
    }
}

async fn read(worker: &CacheWorker, slug: &str) {
    worker
        .banners
        .get_banner(&RequestContext::frontend("/"), slug, &BannerSettings::new())
        .await
        .expect("read")
        .expect("banner exists");
}

fn cached(fixture: &Fixture, worker: &CacheWorker, slug: &str) -> bool {
    let prefix = worker.context.deriver().base_prefix(BANNER_OBJECT, slug);
    fixture.store.contains_prefix(&prefix)
}

#[tokio::test]
async fn object_update_purges_only_that_banner() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();
    read(&worker, "summer-sale").await;
    read(&worker, "winter-sale").await;
    assert_eq!(fixture.repo.slug_calls(), 2);

    worker.events.object_updated("42").await;

    assert!(!cached(&fixture, &worker, "summer-sale"));
    assert!(cached(&fixture, &worker, "winter-sale"));

    read(&worker, "summer-sale").await;
    read(&worker, "winter-sale").await;
    assert_eq!(fixture.repo.slug_calls(), 3);
}

#[tokio::test]
async fn update_purges_every_variant() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();
    let slug = "summer-sale";

    for request in [
        RequestContext::frontend("/"),
        RequestContext::frontend("/").with_locale("de_DE"),
        RequestContext::frontend("/").with_viewer(5),
    ] {
        worker
            .banners
            .get_banner(&request, slug, &BannerSettings::new())
            .await
            .expect("read");
    }
    assert_eq!(fixture.store.len(), 3);

    worker.events.object_updated(slug).await;

    assert_eq!(fixture.store.len(), 0);
    assert!(worker.context.chain().memory().is_empty());
}

#[tokio::test]
async fn deleted_banner_is_purged_by_raw_identifier() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();
    read(&worker, "summer-sale").await;

    fixture.repo.remove(42);
    worker.events.object_deleted("summer-sale").await;
    worker.events.object_deleted("summer-sale").await;

    assert!(!cached(&fixture, &worker, "summer-sale"));
    let record = worker
        .banners
        .get_banner(&RequestContext::frontend("/"), "summer-sale", &BannerSettings::new())
        .await
        .expect("read");
    assert!(record.is_none());
}

#[tokio::test]
async fn unresolvable_id_falls_back_to_the_raw_identifier() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();

    let slug = worker
        .banners
        .clear_object_cache(&"999".into())
        .await;

    assert_eq!(slug, "999");
    assert_eq!(fixture.repo.id_calls(), 1);
}

#[tokio::test]
async fn purges_reach_other_workers_through_shared_tiers() {
    let fixture = fixture();
    let reader = fixture.runtime.worker();
    read(&reader, "summer-sale").await;

    let editor = fixture.runtime.worker();
    editor.events.object_updated("42").await;

    read(&fixture.runtime.worker(), "summer-sale").await;
    assert_eq!(fixture.repo.slug_calls(), 2);
}

#[tokio::test]
async fn media_change_with_the_tracked_key_flushes_everything() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();
    read(&worker, "summer-sale").await;
    read(&worker, "winter-sale").await;

    let tracked = CacheConfig::default().media_meta_key;
    worker
        .events
        .related_media_changed(7, tracked, Some("{}".to_string()))
        .await;

    assert_eq!(fixture.store.len(), 0);
    assert!(worker.context.chain().memory().is_empty());
}

#[tokio::test]
async fn media_change_with_another_key_is_ignored() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();
    read(&worker, "summer-sale").await;

    worker
        .events
        .related_media_changed(7, "_edit_lock", None)
        .await;

    assert_eq!(fixture.store.len(), 1);
    read(&worker, "summer-sale").await;
    assert_eq!(fixture.repo.slug_calls(), 1);
}

#[tokio::test]
async fn global_settings_change_flushes_everything() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();
    read(&worker, "summer-sale").await;
    worker
        .banners
        .render_banner(&RequestContext::frontend("/"), "winter-sale", &BannerSettings::new())
        .await
        .expect("render");
    assert_eq!(worker.context.memo().len(), 1);

    worker.events.global_settings_changed().await;

    assert_eq!(fixture.store.len(), 0);
    assert!(worker.context.memo().is_empty());
}

#[tokio::test]
async fn context_start_preloads_visitor_contexts_only() {
    let fixture = fixture();

    let admin = fixture.runtime.worker();
    admin
        .events
        .context_started(RequestContext::new(ContextKind::Admin))
        .await;
    assert_eq!(fixture.repo.slug_calls(), 0);
    assert_eq!(fixture.store.len(), 0);

    let visitor = fixture.runtime.worker();
    visitor
        .events
        .context_started(RequestContext::frontend("/"))
        .await;
    assert_eq!(fixture.repo.slug_calls(), 2);
    assert_eq!(visitor.context.chain().memory().len(), 2);

    read(&visitor, "summer-sale").await;
    assert_eq!(fixture.repo.slug_calls(), 2);
}

#[tokio::test]
async fn events_arrive_in_epoch_order() {
    let fixture = fixture();
    let worker = fixture.runtime.worker();

    let first = worker.events.global_settings_changed().await;
    let second = worker
        .events
        .publish(LifecycleEvent::ObjectUpdated {
            identifier: "43".to_string(),
        })
        .await;

    assert!(second.epoch > first.epoch);
    assert_eq!(second.kind.label(), "object_updated");
}

mod hooks;
mod middleware;
mod public;

pub use middleware::{REQUESTED_WITH_HEADER, VIEWER_HEADER};

use axum::{
    Json, Router,
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use serde::Serialize;

use crate::cache::{CacheRuntime, fragment_cache_layer};

#[derive(Clone)]
pub struct HttpState {
    pub runtime: CacheRuntime,
}

impl HttpState {
    pub fn new(runtime: CacheRuntime) -> Self {
        Self { runtime }
    }
}

pub fn build_router(state: HttpState) -> Router {
    let cached_routes = Router::new()
        .route("/banners/{slug}", get(public::banner_page))
        .layer(from_fn(fragment_cache_layer));

    Router::new()
        .merge(cached_routes)
        .route("/hooks/events", post(hooks::publish_event))
        .route("/health", get(health))
        .layer(from_fn_with_state(state.clone(), middleware::cache_worker))
        .layer(from_fn(middleware::log_responses))
        .layer(from_fn(middleware::request_context))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthReport {
    tiers: Vec<&'static str>,
    distributed_degraded: bool,
}

async fn health(State(state): State<HttpState>) -> Json<HealthReport> {
    let backends = state.runtime.backends();
    Json(HealthReport {
        tiers: backends.active_tiers(),
        distributed_degraded: backends.distributed_degraded(),
    })
}

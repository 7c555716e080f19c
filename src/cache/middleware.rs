//! Fragment cache middleware.
//!
//! Wraps rendering with the render-start/render-end hooks: a cached fragment
//! short-circuits the handler, a fresh 200 response is captured and stored.
//! Expects a [`CacheWorker`] and a [`RequestContext`] in the request
//! extensions; without them the request passes through untouched.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use super::bypass::RequestContext;
use super::fragments::FragmentLookup;
use super::runtime::CacheWorker;

/// Largest response body that is captured for caching.
const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Response header reporting how the fragment cache treated the request.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn fragment_cache_layer(request: Request<Body>, next: Next) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let (Some(worker), Some(context)) = (
        request.extensions().get::<CacheWorker>().cloned(),
        request.extensions().get::<RequestContext>().cloned(),
    ) else {
        return next.run(request).await;
    };

    let capture = match worker.fragments.maybe_prime(&context).await {
        FragmentLookup::Bypass => return next.run(request).await,
        FragmentLookup::Hit(payload) => {
            debug!(cache = "fragment", outcome = "hit", "serving cached fragment");
            return cached_response(payload);
        }
        FragmentLookup::Miss(capture) => capture,
    };

    debug!(
        cache = "fragment",
        outcome = "miss",
        "cache miss, executing handler"
    );
    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CAPTURE_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "response body could not be captured");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let output = worker.fragments.maybe_finalize(&context, capture, bytes).await;
    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));
    Response::from_parts(parts, Body::from(output))
}

fn cached_response(payload: Bytes) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::HeaderName::from_static(CACHE_STATUS_HEADER), "hit"),
        ],
        payload,
    )
        .into_response()
}

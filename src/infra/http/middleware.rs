use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::cache::{ContextKind, RequestContext};

use super::HttpState;

/// Header identifying an automated caller.
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";
/// Header carrying the identified viewer.
pub const VIEWER_HEADER: &str = "x-viewer-id";

const ADMIN_PREFIX: &str = "/admin";
const HOOKS_PREFIX: &str = "/hooks";
const BANNER_PREFIX: &str = "/banners/";

/// Derive the execution context of the request and store it in the
/// request extensions.
pub async fn request_context(mut request: Request<Body>, next: Next) -> Response {
    let context = derive_context(&request);
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Give the request its own cache worker: a fresh memory tier and render
/// memo, torn down once the response is produced.
pub async fn cache_worker(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let worker = state.runtime.worker();
    let context = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    worker.events.context_started(context).await;

    request.extensions_mut().insert(worker.clone());
    let response = next.run(request).await;
    worker.teardown();
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let kind = request
        .extensions()
        .get::<RequestContext>()
        .map(|context| context.kind)
        .unwrap_or_default();
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let span = info_span!("http_request", %request_id, method = %method, path = %uri.path());
    let response = next.run(request).instrument(span).await;
    let status = response.status();

    if status.is_server_error() {
        error!(
            target = "banner_cache::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = start.elapsed().as_millis(),
            context = ?kind,
            %request_id,
            "request failed",
        );
    } else if status.is_client_error() {
        warn!(
            target = "banner_cache::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = start.elapsed().as_millis(),
            context = ?kind,
            %request_id,
            "client request error",
        );
    }

    response
}

pub(crate) fn derive_context<B>(request: &Request<B>) -> RequestContext {
    let uri = request.uri();
    let path = uri.path();
    let headers = request.headers();

    let kind = if path == ADMIN_PREFIX || path.starts_with("/admin/") {
        ContextKind::Admin
    } else if path.starts_with(HOOKS_PREFIX) || is_programmatic(headers) {
        ContextKind::Programmatic
    } else {
        ContextKind::Frontend
    };

    RequestContext {
        kind,
        locale: locale(headers),
        viewer_id: header_str(headers, VIEWER_HEADER).and_then(|raw| raw.trim().parse().ok()),
        resource: resource(path),
        path: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.to_string()),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn is_programmatic(headers: &HeaderMap) -> bool {
    header_str(headers, REQUESTED_WITH_HEADER)
        .is_some_and(|value| value.eq_ignore_ascii_case("xmlhttprequest"))
}

/// First language tag of `Accept-Language`, as `ll_CC`.
fn locale(headers: &HeaderMap) -> Option<String> {
    let raw = header_str(headers, header::ACCEPT_LANGUAGE.as_str())?;
    let tag = raw.split(',').next()?.split(';').next()?.trim();
    if tag.is_empty() || tag == "*" {
        return None;
    }
    Some(tag.replace('-', "_"))
}

/// The banner slug when the path addresses exactly one banner.
fn resource(path: &str) -> Option<String> {
    let rest = path.strip_prefix(BANNER_PREFIX)?.trim_end_matches('/');
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest.to_string())
}

//! HTTP interception layer.
//!
//! Every request reaching the router is mapped onto the origin and handed to
//! the worker, the way a browser hands a page's requests to its service
//! worker. Responses carry an `x-offcache-source` header naming where the
//! body came from.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use offcache_client::fetch::strip_hop_by_hop;
use offcache_client::{FetchRequest, header, resolve_on_origin};
use tower_http::trace::TraceLayer;

use crate::error::ProxyError;
use crate::worker::{Served, Worker};

pub const SOURCE_HEADER: &str = "x-offcache-source";

/// Build the interception router.
pub fn router(worker: Arc<Worker>) -> Router {
    Router::new()
        .fallback(intercept)
        .layer(TraceLayer::new_for_http())
        .with_state(worker)
}

async fn intercept(State(worker): State<Arc<Worker>>, request: Request) -> Result<Served, ProxyError> {
    let (parts, body) = request.into_parts();
    let limit = worker.config().max_bytes;

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ProxyError::PayloadTooLarge(limit));
    }
    let body = to_bytes(body, limit)
        .await
        .map_err(|_| ProxyError::PayloadTooLarge(limit))?;

    let target = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = resolve_on_origin(worker.origin(), target).map_err(|e| ProxyError::BadRequest(e.to_string()))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    let request = FetchRequest { method: parts.method, url, headers, body };
    worker.handle_fetch(request).await.map_err(|e| {
        tracing::warn!(error = %e, "pass-through failed");
        ProxyError::BadGateway(e.to_string())
    })
}

impl IntoResponse for Served {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(SOURCE_HEADER, HeaderValue::from_static(self.source.as_str()));
        response
    }
}

//! Per-request spans.
//!
//! # Design Decisions
//! - One `request` span per inbound request, opened by the HTTP trace layer
//! - The span carries the request ID so every gate event can be correlated
//! - Query strings stay out of the span; they may carry tokens

use axum::body::Body;
use axum::http::Request;
use tracing::Span;

use crate::http::request::X_REQUEST_ID;

/// Span for one request, tagged with its ID.
pub fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

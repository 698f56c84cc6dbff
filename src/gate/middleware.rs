//! Axum glue for the gate.
//!
//! `request_gate` wraps the whole application; `mutation_guard` protects
//! privileged routers from inside it.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::gate::{Gate, GateDecision};
use crate::http::request::RequestFacts;
use crate::http::response::{redirect, GateRejection};
use crate::security::headers::apply_headers;
use crate::security::{RateLimitOutcome, X_NONCE};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Per-request policy chain: host redirect, rate limit, security headers.
pub async fn request_gate(
    State(gate): State<Arc<Gate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let facts = RequestFacts::from_request(&request);
    let nonce = gate.nonce();
    let security_headers = gate.security_headers(nonce.as_ref());

    let rate_limit = match gate.decide(&facts, nonce.is_some()) {
        GateDecision::Redirect(target) => return redirect(&target),
        GateDecision::NonceUnavailable => {
            return GateRejection::Internal("csp nonce unavailable").into_response();
        }
        GateDecision::RateLimited {
            class,
            retry_after_secs,
        } => {
            let mut response = GateRejection::RateLimited {
                class,
                retry_after_secs,
            }
            .into_response();
            apply_headers(response.headers_mut(), &security_headers);
            return response;
        }
        GateDecision::Passed { rate_limit, .. } => rate_limit,
    };

    match nonce {
        Some(nonce) => {
            if let Ok(value) = HeaderValue::from_str(nonce.as_str()) {
                request.headers_mut().insert(X_NONCE, value);
            }
            request.extensions_mut().insert(nonce);
        }
        None => {
            request.headers_mut().remove(X_NONCE);
        }
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &security_headers);
    if let Some(outcome) = rate_limit {
        insert_rate_limit_headers(response.headers_mut(), &outcome);
    }
    response
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, outcome: &RateLimitOutcome) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(outcome.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(outcome.remaining));
}

/// Guard for state-changing routers: trusted origin first, then an admin session.
pub async fn mutation_guard(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let facts = RequestFacts::from_request(&request);
    gate.check_origin(&facts)?;
    gate.authorize(request.headers(), &facts)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::security::{CspNonce, NonceError};
    use axum::body::Body;
    use axum::http::header::{CONTENT_SECURITY_POLICY, LOCATION};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{middleware, Extension, Router};
    use tower::ServiceExt;

    fn failing_nonce() -> Result<CspNonce, NonceError> {
        Err(NonceError::from(rand::Error::new(std::io::Error::other("no entropy"))))
    }

    fn app(gate: Gate) -> Router {
        shared_app(Arc::new(gate))
    }

    fn shared_app(gate: Arc<Gate>) -> Router {
        Router::new()
            .route("/admin", get(|| async { "admin" }))
            .route("/videos", get(|| async { "videos" }))
            .route(
                "/nonce",
                get(|Extension(nonce): Extension<CspNonce>, headers: HeaderMap| async move {
                    let echoed = headers.get(X_NONCE).cloned();
                    assert_eq!(echoed.as_ref().and_then(|v| v.to_str().ok()), Some(nonce.as_str()));
                    nonce.0
                }),
            )
            .layer(middleware::from_fn_with_state(gate, request_gate))
    }

    fn get_req(host: &str, path: &str) -> Request {
        Request::builder()
            .uri(path)
            .header("host", host)
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_passed_request_gets_headers() {
        let response = app(Gate::new(GateConfig::default()))
            .oneshot(get_req("example.com", "/admin"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let csp = response.headers()[CONTENT_SECURITY_POLICY].to_str().unwrap();
        let nonce = response.headers()[X_NONCE].to_str().unwrap();
        assert!(csp.contains(&format!("'nonce-{nonce}'")));
        assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "20");
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "19");
    }

    #[tokio::test]
    async fn test_nonce_reaches_handler() {
        let response = app(Gate::new(GateConfig::default()))
            .oneshot(get_req("example.com", "/nonce"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(X_RATELIMIT_LIMIT).is_none());
    }

    #[tokio::test]
    async fn test_redirect_has_no_security_headers() {
        let mut config = GateConfig::default();
        config.host_routing.admin_host = Some("admin.example.com".to_string());
        let response = app(Gate::new(config))
            .oneshot(get_req("main.example.com", "/admin"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "https://admin.example.com/admin");
        assert!(response.headers().get(CONTENT_SECURITY_POLICY).is_none());
    }

    #[tokio::test]
    async fn test_nonce_failure_fails_closed_on_admin_paths() {
        let gate = Gate::new(GateConfig::default()).with_nonce_source(failing_nonce);
        let app = app(gate);

        let response = app.clone().oneshot(get_req("example.com", "/admin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = app.oneshot(get_req("example.com", "/videos")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let csp = response.headers()[CONTENT_SECURITY_POLICY].to_str().unwrap();
        assert!(!csp.contains("nonce-"));
        assert!(response.headers().get(X_NONCE).is_none());
    }

    #[tokio::test]
    async fn test_nonce_failure_takes_no_rate_limit_slot() {
        let gate = Arc::new(Gate::new(GateConfig::default()).with_nonce_source(failing_nonce));
        let app = shared_app(gate.clone());

        for _ in 0..3 {
            let response = app.clone().oneshot(get_req("example.com", "/admin")).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert!(gate.limiter().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_response_carries_headers() {
        let mut config = GateConfig::default();
        config.rate_limit.admin.max_requests = 1;
        let app = app(Gate::new(config));

        let first = app.clone().oneshot(get_req("example.com", "/admin")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[X_RATELIMIT_REMAINING], "0");

        let second = app.oneshot(get_req("example.com", "/admin")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().get(CONTENT_SECURITY_POLICY).is_some());
        assert_eq!(second.headers()["retry-after"], "60");
    }
}

//! Admin endpoints of the bundled application.
//!
//! Every handler re-derives the admin session itself; the router-level
//! `mutation_guard` runs first, so a missing layer does not open the route.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};

use self::handlers::{get_status, ping};
use crate::gate::{mutation_guard, Gate};

pub use auth::{AdminSession, TrustedOrigin};

pub fn admin_router(gate: Arc<Gate>) -> Router<Arc<Gate>> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/api/admin/ping", post(ping))
        .route_layer(middleware::from_fn_with_state(gate, mutation_guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::security::{CallerSession, Role, SignedSessionResolver};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn setup() -> (Router, String) {
        let mut config = GateConfig::default();
        config.session.secret = SECRET.to_string();
        config.origins.app_url = Some("https://example.com".to_string());
        let token = SignedSessionResolver::new(&config.session)
            .issue(&CallerSession {
                role: Role::Admin,
                client_ip: "203.0.113.9".to_string(),
                login_time: std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_secs(),
            })
            .unwrap();
        let gate = Arc::new(Gate::new(config));
        (admin_router(gate.clone()).with_state(gate), token)
    }

    fn ping_req(origin: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/ping")
            .header("host", "example.com")
            .header("origin", origin);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ping_requires_origin_and_session() {
        let (app, token) = setup();

        let response = app
            .clone()
            .oneshot(ping_req("https://example.com", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(ping_req("https://evil.example", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.oneshot(ping_req("https://example.com", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_requires_admin() {
        let (app, token) = setup();
        let request = |token: Option<&str>| {
            let mut builder = Request::builder().uri("/admin/status").header("host", "example.com");
            if let Some(token) = token {
                builder = builder.header("cookie", format!("site_session={token}"));
            }
            builder.body(Body::empty()).unwrap()
        };

        let response = app.clone().oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

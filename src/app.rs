//! Minimal application mounted behind the gate by the bundled binary.
//!
//! Content pages are served elsewhere; these routes exist so the gate has
//! something to protect and operators have something to probe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::admin::admin_router;
use crate::gate::Gate;
use crate::http::response::ErrorBody;
use crate::security::Role;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub role: Role,
}

pub fn router(gate: Arc<Gate>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/session", get(session))
        .merge(admin_router(gate.clone()))
        .fallback(not_found)
        .with_state(gate)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn session(State(gate): State<Arc<Gate>>, headers: HeaderMap) -> Json<SessionInfo> {
    let session = gate.resolve_session(&headers);
    Json(SessionInfo {
        authenticated: session.is_some(),
        role: session.map_or(Role::None, |s| s.role),
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not Found")))
}

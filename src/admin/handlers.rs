use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::admin::auth::{AdminSession, TrustedOrigin};
use crate::gate::Gate;

#[derive(Debug, Serialize)]
pub struct AdminStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub rate_limit_buckets: usize,
    pub admin_host: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub success: bool,
    pub client_ip: String,
    pub login_time: u64,
}

pub async fn get_status(
    State(gate): State<Arc<Gate>>,
    AdminSession(_session): AdminSession,
) -> Json<AdminStatus> {
    Json(AdminStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        rate_limit_buckets: gate.limiter().len(),
        admin_host: gate.config().host_routing.admin_host.clone(),
    })
}

/// State-changing admin endpoint: origin is checked before the session.
pub async fn ping(_origin: TrustedOrigin, AdminSession(session): AdminSession) -> Json<PingResponse> {
    tracing::info!(client_ip = %session.client_ip, "Admin ping");
    Json(PingResponse {
        success: true,
        client_ip: session.client_ip,
        login_time: session.login_time,
    })
}

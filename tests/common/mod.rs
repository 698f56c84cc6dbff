//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;

use site_gate::config::GateConfig;
use site_gate::http::build_router;
use site_gate::security::{CallerSession, Role, SignedSessionResolver};
use site_gate::{app, Gate};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const ADMIN_HOST: &str = "admin.example.com";
pub const MAIN_HOST: &str = "main.example.com";
pub const CLIENT_IP: &str = "203.0.113.7";

/// Defaults plus a known secret and trusted app origin.
pub fn test_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.session.secret = SECRET.to_string();
    config.origins.app_url = Some(format!("https://{MAIN_HOST}"));
    config
}

pub fn with_admin_host(mut config: GateConfig) -> GateConfig {
    config.host_routing.admin_host = Some(ADMIN_HOST.to_string());
    config
}

/// Full production stack around the bundled application.
pub fn gated_app(config: GateConfig) -> (Router, Arc<Gate>) {
    let gate = Arc::new(Gate::new(config));
    (build_router(gate.clone(), app::router(gate.clone())), gate)
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn token(config: &GateConfig, role: Role) -> String {
    SignedSessionResolver::new(&config.session)
        .issue(&CallerSession {
            role,
            client_ip: CLIENT_IP.to_string(),
            login_time: unix_now(),
        })
        .unwrap()
}

pub fn request(method: Method, host: &str, path: &str) -> axum::http::request::Builder {
    request_from(method, host, path, CLIENT_IP)
}

pub fn request_from(
    method: Method,
    host: &str,
    path: &str,
    client_ip: &str,
) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(path)
        .header("host", host)
        .header("x-forwarded-for", client_ip)
}

pub fn get(host: &str, path: &str) -> Request<Body> {
    request(Method::GET, host, path).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): gate outcomes by `decision`
//! - `gate_rate_limited_total` (counter): 429s by route `class`
//! - `gate_origin_rejections_total` (counter): 403s from origin validation
//! - `gate_unauthorized_total` (counter): 401s from the admin guard
//! - `gate_rate_limit_buckets` (gauge): tracked rate-limit buckets
//!
//! Recording is a no-op until a recorder is installed, so tests need no setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::RouteClass;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_decision(decision: &'static str) {
    metrics::counter!("gate_decisions_total", "decision" => decision).increment(1);
}

pub fn record_rate_limited(class: RouteClass) {
    metrics::counter!("gate_rate_limited_total", "class" => class.as_str()).increment(1);
}

pub fn record_origin_rejection() {
    metrics::counter!("gate_origin_rejections_total").increment(1);
}

pub fn record_unauthorized() {
    metrics::counter!("gate_unauthorized_total").increment(1);
}

pub fn record_bucket_count(count: usize) {
    metrics::gauge!("gate_rate_limit_buckets").set(count as f64);
}

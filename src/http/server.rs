//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the application router with the request gate
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener with graceful shutdown
//! - Run the rate-limit sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::gate::{request_gate, Gate};
use crate::lifecycle::Shutdown;
use crate::observability::tracing::request_span;
use crate::security::rate_limit::spawn_sweeper;

/// HTTP server fronting an application with the request gate.
pub struct HttpServer {
    router: Router,
    gate: Arc<Gate>,
}

impl HttpServer {
    /// Wrap `app` with the gate and the standard middleware stack.
    pub fn new(gate: Arc<Gate>, app: Router) -> Self {
        let router = build_router(gate.clone(), app);
        Self { router, gate }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let limits = &self.gate.config().rate_limit;
        let sweeper = spawn_sweeper(
            self.gate.limiter().clone(),
            Duration::from_secs(limits.sweep_interval_secs),
            shutdown.subscribe(),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        // sweeper has its own receiver; make sure it saw the signal
        shutdown.trigger();
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Rate limit sweeper ended abnormally");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gate(&self) -> &Arc<Gate> {
        &self.gate
    }
}

/// The full middleware stack around `app`, outermost first.
#[allow(deprecated)]
pub fn build_router(gate: Arc<Gate>, app: Router) -> Router {
    let config = gate.config();
    let timeout = Duration::from_secs(config.timeouts.request_secs);
    let max_body = config.security.max_body_size;

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(timeout))
            .layer(DefaultBodyLimit::max(max_body))
            .layer(middleware::from_fn_with_state(gate, request_gate)),
    )
}

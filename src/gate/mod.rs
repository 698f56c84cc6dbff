//! Request gate: the policy chain every inbound request passes through.
//!
//! # Data Flow
//! ```text
//! Request
//!     → RequestFacts (host, path, scheme, origin, client IP)
//!     → decision.rs: HostRouter ──Redirect──▶ 302
//!     → middleware.rs: HeaderInjector (nonce + headers)
//!     → decision.rs: RateLimiter ──limited──▶ 429
//!     → downstream handler (+ headers)
//!
//! Privileged handlers, before mutating:
//!     → Gate::check_origin ──reject──▶ 403
//!     → Gate::authorize ──reject──▶ 401
//! ```
//!
//! # Design Decisions
//! - One immutable `Gate` per process, shared via `Arc`; only the rate-limit
//!   store holds mutable state
//! - The decision is a tagged value computed from `RequestFacts`; writing
//!   status and headers happens only in the axum middleware
//! - Host routing runs before rate limiting, so a misdirected admin request is
//!   redirected even when its budget is exhausted

pub mod decision;
pub mod middleware;

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::GateConfig;
use crate::http::request::RequestFacts;
use crate::http::response::GateRejection;
use crate::observability::metrics;
use crate::routing::{HostRouter, PathClassifier};
use crate::security::headers::generate_nonce;
use crate::security::{
    CallerSession, CspNonce, HeaderInjector, MemoryRateLimiter, NonceError, OriginValidator,
    RateLimitStore, SessionGuard, SessionResolver, SignedSessionResolver,
};

pub use decision::GateDecision;
pub use middleware::{mutation_guard, request_gate};

/// Source of CSP nonces.
pub type NonceSource = fn() -> Result<CspNonce, NonceError>;

/// All gate components, built once from configuration.
pub struct Gate {
    config: Arc<GateConfig>,
    classifier: PathClassifier,
    host_router: HostRouter,
    limiter: Arc<dyn RateLimitStore>,
    origins: OriginValidator,
    headers: HeaderInjector,
    sessions: Arc<dyn SessionResolver>,
    guard: SessionGuard,
    nonce_source: NonceSource,
}

impl Gate {
    /// Build every component from a validated configuration.
    pub fn new(config: GateConfig) -> Self {
        let limiter = Arc::new(MemoryRateLimiter::new(config.rate_limit.max_buckets));
        let sessions = Arc::new(SignedSessionResolver::new(&config.session));
        Self {
            classifier: PathClassifier::new(&config.host_routing),
            host_router: HostRouter::new(&config.host_routing),
            limiter,
            origins: OriginValidator::new(&config.origins),
            headers: HeaderInjector::new(&config.security),
            sessions,
            guard: SessionGuard::new(&config.session),
            nonce_source: generate_nonce,
            config: Arc::new(config),
        }
    }

    /// Replace the bucket store (e.g. with an external counter store).
    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimitStore>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replace the session resolver.
    pub fn with_session_resolver(mut self, sessions: Arc<dyn SessionResolver>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_nonce_source(mut self, nonce_source: NonceSource) -> Self {
        self.nonce_source = nonce_source;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    pub fn limiter(&self) -> &Arc<dyn RateLimitStore> {
        &self.limiter
    }

    /// Fresh nonce; `None` when the RNG failed.
    pub fn nonce(&self) -> Option<CspNonce> {
        match (self.nonce_source)() {
            Ok(nonce) => Some(nonce),
            Err(e) => {
                tracing::error!(error = %e, "CSP nonce generation failed");
                None
            }
        }
    }

    pub fn security_headers(&self, nonce: Option<&CspNonce>) -> HeaderMap {
        self.headers.headers_for(nonce)
    }

    pub fn resolve_session(&self, headers: &HeaderMap) -> Option<CallerSession> {
        self.sessions.resolve(headers)
    }

    /// Origin check for state-changing requests.
    pub fn check_origin(&self, facts: &RequestFacts) -> Result<(), GateRejection> {
        let request_url = facts.request_url(&self.config.host_routing.default_scheme);
        self.origins
            .check(
                &facts.method,
                request_url.as_deref(),
                facts.origin.as_deref(),
                facts.referer.as_deref(),
            )
            .map_err(|reason| {
                tracing::warn!(
                    client_ip = %facts.client_ip,
                    method = %facts.method,
                    path = %facts.path,
                    reason = %reason,
                    "Rejected request origin"
                );
                metrics::record_origin_rejection();
                GateRejection::BadOrigin(reason)
            })
    }

    /// Re-derive the caller's session and require the admin role.
    pub fn authorize(
        &self,
        headers: &HeaderMap,
        facts: &RequestFacts,
    ) -> Result<CallerSession, GateRejection> {
        self.guard
            .authorize(self.resolve_session(headers), &facts.client_ip)
            .map_err(|reason| {
                tracing::warn!(
                    client_ip = %facts.client_ip,
                    path = %facts.path,
                    reason = %reason,
                    "Rejected unauthorized caller"
                );
                metrics::record_unauthorized();
                GateRejection::Unauthorized(reason)
            })
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("classifier", &self.classifier)
            .field("host_router", &self.host_router)
            .field("buckets", &self.limiter.len())
            .finish_non_exhaustive()
    }
}

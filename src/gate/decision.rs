//! The gate's per-request policy decision.

use crate::gate::Gate;
use crate::http::request::RequestFacts;
use crate::observability::metrics;
use crate::routing::{HostDecision, PathClass, RouteClass};
use crate::security::{bucket_key, RateLimitOutcome};

/// Outcome of the policy chain for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Admin-scoped path on the wrong host.
    Redirect(String),
    /// Over budget for the route class.
    RateLimited {
        class: RouteClass,
        retry_after_secs: u64,
    },
    /// Admin-scoped path but no CSP nonce could be generated.
    NonceUnavailable,
    /// Continue downstream.
    Passed {
        class: PathClass,
        rate_limit: Option<RateLimitOutcome>,
    },
}

impl GateDecision {
    pub fn label(&self) -> &'static str {
        match self {
            GateDecision::Redirect(_) => "redirect",
            GateDecision::RateLimited { .. } => "rate_limited",
            GateDecision::NonceUnavailable => "nonce_unavailable",
            GateDecision::Passed { .. } => "passed",
        }
    }
}

impl Gate {
    /// Run host routing, the nonce check, then rate limiting for `facts`.
    ///
    /// Takes a rate-limit slot when the path belongs to a limited route class.
    /// An admin-scoped request without a nonce stops before the limiter.
    pub fn decide(&self, facts: &RequestFacts, nonce_ready: bool) -> GateDecision {
        let class = self.classifier.classify(&facts.path);

        if let HostDecision::Redirect(target) = self.host_router.route(
            class,
            facts.host.as_deref(),
            &facts.path,
            facts.query.as_deref(),
            facts.scheme.as_deref(),
        ) {
            tracing::debug!(path = %facts.path, target = %target, "Redirecting to admin host");
            return self.finish(GateDecision::Redirect(target));
        }

        if !nonce_ready && class.is_admin_scoped() {
            tracing::error!(path = %facts.path, "CSP nonce unavailable on admin path");
            return self.finish(GateDecision::NonceUnavailable);
        }

        let limits = &self.config.rate_limit;
        let Some(route_class) = class.rate_class().filter(|_| limits.enabled) else {
            return self.finish(GateDecision::Passed {
                class,
                rate_limit: None,
            });
        };

        let limit = match route_class {
            RouteClass::Admin => limits.admin,
            RouteClass::Api => limits.api,
        };
        let key = bucket_key(route_class, &facts.client_ip);
        let outcome = self.limiter.take(&key, limit.max_requests, limit.window());

        if outcome.limited {
            tracing::warn!(
                client_ip = %facts.client_ip,
                class = %route_class,
                path = %facts.path,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(route_class);
            return self.finish(GateDecision::RateLimited {
                class: route_class,
                retry_after_secs: limit.retry_after_secs(),
            });
        }

        self.finish(GateDecision::Passed {
            class,
            rate_limit: Some(outcome),
        })
    }

    fn finish(&self, decision: GateDecision) -> GateDecision {
        metrics::record_decision(decision.label());
        decision
    }
}

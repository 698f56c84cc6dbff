//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the request gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Main-site / admin-site host isolation.
    pub host_routing: HostRoutingConfig,

    /// Per route class rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Trusted origins for state-changing requests.
    pub origins: OriginConfig,

    /// Signed session settings.
    pub session: SessionConfig,

    /// Security header settings.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Host isolation between the main site and the admin site.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostRoutingConfig {
    /// Host (or URL) that serves the admin surface. `None` disables host isolation.
    pub admin_host: Option<String>,

    /// Allow admin paths to be served from the main host as well.
    pub allow_admin_on_main_site: bool,

    /// Path prefixes belonging to the admin surface.
    pub admin_prefixes: Vec<String>,

    /// Prefix of the authentication endpoints.
    pub auth_prefix: String,

    /// Authentication callback; reachable on every host.
    pub auth_callback_path: String,

    /// Prefix of the JSON API.
    pub api_prefix: String,

    /// Scheme used for redirects when the request does not reveal one.
    pub default_scheme: String,
}

impl Default for HostRoutingConfig {
    fn default() -> Self {
        Self {
            admin_host: None,
            allow_admin_on_main_site: false,
            admin_prefixes: vec!["/admin".to_string(), "/api/admin".to_string()],
            auth_prefix: "/api/auth".to_string(),
            auth_callback_path: "/api/auth/callback".to_string(),
            api_prefix: "/api".to_string(),
            default_scheme: "https".to_string(),
        }
    }
}

/// Budget for one route class.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteLimit {
    /// Requests allowed per window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RouteLimit {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Window length rounded up to whole seconds, as sent in `Retry-After`.
    pub fn retry_after_secs(&self) -> u64 {
        self.window_ms.div_ceil(1000).max(1)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Budget for admin-scoped paths.
    pub admin: RouteLimit,

    /// Budget for API paths.
    pub api: RouteLimit,

    /// Soft cap on tracked buckets before expired ones are purged inline.
    pub max_buckets: usize,

    /// Interval of the background sweep of expired buckets.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin: RouteLimit {
                max_requests: 20,
                window_ms: 60_000,
            },
            api: RouteLimit {
                max_requests: 100,
                window_ms: 60_000,
            },
            max_buckets: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Origins trusted for state-changing requests.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OriginConfig {
    /// Canonical application URL.
    pub app_url: Option<String>,

    /// Deployment-assigned URL or hostname.
    pub platform_url: Option<String>,

    /// Extra allow-list.
    pub allowed: Vec<String>,
}

/// Signed session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session token.
    pub cookie_name: String,

    /// HMAC key for session tokens.
    pub secret: String,

    /// Session lifetime in seconds.
    pub max_age_secs: u64,

    /// Reject sessions presented from a different client IP than the one they were issued to.
    pub bind_to_client_ip: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "site_session".to_string(),
            // must be supplied; validation rejects an empty key
            secret: String::new(),
            max_age_secs: 7 * 24 * 60 * 60,
            bind_to_client_ip: false,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable the static security header bundle.
    pub enable_headers: bool,
    /// `Strict-Transport-Security` max-age.
    pub hsts_max_age_secs: u64,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            hsts_max_age_secs: 63_072_000,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

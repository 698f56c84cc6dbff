//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits and windows > 0)
//! - Check that every configured host and origin parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::{GateConfig, RouteLimit};
use crate::routing::host::AdminHost;
use crate::security::origin::normalize_origin;

/// Minimum HMAC key length for session tokens.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("rate_limit.{class}.max_requests must be greater than zero")]
    ZeroMaxRequests { class: &'static str },

    #[error("rate_limit.{class}.window_ms must be greater than zero")]
    ZeroWindow { class: &'static str },

    #[error("rate_limit.max_buckets must be greater than zero")]
    ZeroMaxBuckets,

    #[error("host_routing.admin_host is not a valid host: {0:?}")]
    InvalidAdminHost(String),

    #[error("{field} is not a valid origin: {value:?}")]
    InvalidOrigin { field: &'static str, value: String },

    #[error("path prefix must start with '/': {0:?}")]
    InvalidPrefix(String),

    #[error("session.secret must be at least {} bytes", MIN_SESSION_SECRET_LEN)]
    WeakSessionSecret,

    #[error("observability.log_format must be \"pretty\" or \"json\", got {0:?}")]
    UnknownLogFormat(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_limit(&mut errors, "admin", &config.rate_limit.admin);
    check_limit(&mut errors, "api", &config.rate_limit.api);
    if config.rate_limit.max_buckets == 0 {
        errors.push(ValidationError::ZeroMaxBuckets);
    }

    let routing = &config.host_routing;
    if let Some(host) = &routing.admin_host {
        if AdminHost::parse(host).is_none() {
            errors.push(ValidationError::InvalidAdminHost(host.clone()));
        }
    }
    for prefix in routing
        .admin_prefixes
        .iter()
        .chain([&routing.auth_prefix, &routing.auth_callback_path, &routing.api_prefix])
    {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix(prefix.clone()));
        }
    }

    let origins = &config.origins;
    check_origin(&mut errors, "origins.app_url", origins.app_url.as_deref());
    check_origin(&mut errors, "origins.platform_url", origins.platform_url.as_deref());
    for allowed in &origins.allowed {
        check_origin(&mut errors, "origins.allowed", Some(allowed));
    }

    if config.session.secret.len() < MIN_SESSION_SECRET_LEN {
        errors.push(ValidationError::WeakSessionSecret);
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::UnknownLogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_limit(errors: &mut Vec<ValidationError>, class: &'static str, limit: &RouteLimit) {
    if limit.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests { class });
    }
    if limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow { class });
    }
}

fn check_origin(errors: &mut Vec<ValidationError>, field: &'static str, value: Option<&str>) {
    if let Some(value) = value {
        if normalize_origin(value).is_none() {
            errors.push(ValidationError::InvalidOrigin {
                field,
                value: value.to_string(),
            });
        }
    }
}

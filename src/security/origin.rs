//! Origin validation for state-changing requests.
//!
//! # Responsibilities
//! - Resolve the origin a request claims (`Origin`, else `Referer`)
//! - Build the set of trusted origins for the request
//! - Reject state-changing requests whose origin is missing, malformed or untrusted
//!
//! # Design Decisions
//! - Only POST/PUT/PATCH/DELETE are checked; reads are not a forgery vector here
//! - Comparison is exact equality of canonical `scheme://host[:port]` strings,
//!   so look-alike hosts (prefix/suffix matches) never pass
//! - Fail closed: anything that does not parse is rejected

use std::collections::HashSet;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::Method;
use url::Url;

use crate::config::OriginConfig;

/// Why a request's origin was rejected. Logged, never sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OriginRejection {
    #[error("no Origin or Referer header")]
    Missing,

    #[error("unparseable origin {0:?}")]
    Malformed(String),

    #[error("origin {0} is not allowed")]
    NotAllowed(String),
}

/// Canonical origin of a configured URL or bare hostname.
///
/// Bare hostnames (as deployment platforms usually provide them) are assumed `https`.
/// A bare value must be a plain `host[:port]` authority.
pub fn normalize_origin(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.contains("://") {
        return origin_of(raw);
    }
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }

    let authority = Authority::from_str(raw).ok()?;
    if authority.as_str().contains('@') {
        return None;
    }
    // "host:" or "host:abc" is a scheme-like typo, not a port
    let after_host = &authority.as_str()[authority.host().len()..];
    if after_host.starts_with(':') && authority.port_u16().is_none() {
        return None;
    }
    origin_of(&format!("https://{authority}"))
}

/// Canonical origin of an absolute http(s) URL: lowercase host, default port stripped.
fn origin_of(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().filter(|h| !h.is_empty())?;

    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization())
}

/// Methods that change state and therefore need a trusted origin.
pub fn is_state_changing(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

/// Trusted origins for one request.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: HashSet<String>,
}

impl AllowedOrigins {
    pub fn contains(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }
}

/// Configured origins, normalized once at startup.
#[derive(Debug, Clone, Default)]
pub struct OriginValidator {
    configured: HashSet<String>,
}

impl OriginValidator {
    /// Entries that do not parse are skipped; validation rejects such configs up front.
    pub fn new(config: &OriginConfig) -> Self {
        let configured = config
            .app_url
            .iter()
            .chain(config.platform_url.iter())
            .chain(config.allowed.iter())
            .filter_map(|raw| normalize_origin(raw))
            .collect();
        Self { configured }
    }

    /// Union of the configured origins and the request's own origin.
    ///
    /// `request_url` is the URL the request was addressed to (scheme + `Host`).
    pub fn allowed_for(&self, request_url: Option<&str>) -> AllowedOrigins {
        let mut origins = self.configured.clone();
        if let Some(own) = request_url.and_then(origin_of) {
            origins.insert(own);
        }
        AllowedOrigins { origins }
    }

    /// Check a request against the configured origins plus its own.
    pub fn check(
        &self,
        method: &Method,
        request_url: Option<&str>,
        origin_header: Option<&str>,
        referer_header: Option<&str>,
    ) -> Result<(), OriginRejection> {
        if !is_state_changing(method) {
            return Ok(());
        }
        validate(
            method,
            origin_header,
            referer_header,
            &self.allowed_for(request_url),
        )
    }
}

/// Accept or reject a request based on the origin it claims.
pub fn validate(
    method: &Method,
    origin_header: Option<&str>,
    referer_header: Option<&str>,
    allowed: &AllowedOrigins,
) -> Result<(), OriginRejection> {
    if !is_state_changing(method) {
        return Ok(());
    }

    let claimed = match (origin_header, referer_header) {
        (Some(origin), _) => origin,
        (None, Some(referer)) => referer,
        (None, None) => return Err(OriginRejection::Missing),
    };

    let origin = origin_of(claimed).ok_or_else(|| OriginRejection::Malformed(claimed.to_string()))?;
    if allowed.contains(&origin) {
        Ok(())
    } else {
        Err(OriginRejection::NotAllowed(origin))
    }
}

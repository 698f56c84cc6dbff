//! Security response headers and per-request CSP nonce.
//!
//! # Responsibilities
//! - Generate a fresh nonce for every request (OS CSPRNG, 16 bytes, base64)
//! - Build the nonce-scoped `Content-Security-Policy`
//! - Attach the defensive header bundle to responses
//! - Expose the nonce to downstream rendering (`x-nonce`)
//!
//! # Design Decisions
//! - The nonce never derives from request content and is never reused
//! - Static headers are built once at startup
//! - Without a nonce the CSP falls back to `script-src 'self'` (no inline scripts)

use axum::http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS,
    X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::config::SecurityConfig;

/// Header carrying the nonce to templates (request) and clients (response).
pub const X_NONCE: HeaderName = HeaderName::from_static("x-nonce");

const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// Raw nonce length in bytes.
pub const NONCE_LEN: usize = 16;

/// Nonce for the current response, available to handlers as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspNonce(pub String);

impl CspNonce {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("nonce generation failed: {0}")]
pub struct NonceError(#[from] rand::Error);

/// Draw a fresh nonce from the operating system RNG.
pub fn generate_nonce() -> Result<CspNonce, NonceError> {
    let mut bytes = [0u8; NONCE_LEN];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(CspNonce(STANDARD.encode(bytes)))
}

/// Content security policy, nonce-scoped when a nonce is available.
pub fn content_security_policy(nonce: Option<&CspNonce>) -> String {
    let script_src = match nonce {
        Some(nonce) => format!("script-src 'self' 'nonce-{}' 'strict-dynamic'", nonce.as_str()),
        None => "script-src 'self'".to_string(),
    };
    [
        "default-src 'self'",
        script_src.as_str(),
        "style-src 'self' 'unsafe-inline'",
        "img-src 'self' blob: data: https:",
        "media-src 'self' blob: https:",
        "font-src 'self' data:",
        "connect-src 'self' https:",
        "object-src 'none'",
        "base-uri 'self'",
        "form-action 'self'",
        "frame-ancestors 'none'",
        "upgrade-insecure-requests",
    ]
    .join("; ")
}

/// Builds the header bundle attached to every non-redirect response.
#[derive(Debug, Clone)]
pub struct HeaderInjector {
    static_headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderInjector {
    pub fn new(config: &SecurityConfig) -> Self {
        let mut static_headers = Vec::new();
        if config.enable_headers {
            static_headers.extend([
                (X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("on")),
                (X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
                (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
                (REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin")),
                (
                    PERMISSIONS_POLICY,
                    HeaderValue::from_static("camera=(), microphone=(), geolocation=(), payment=()"),
                ),
            ]);
            let hsts = format!(
                "max-age={}; includeSubDomains; preload",
                config.hsts_max_age_secs
            );
            if let Ok(value) = HeaderValue::try_from(hsts) {
                static_headers.push((STRICT_TRANSPORT_SECURITY, value));
            }
        }
        Self { static_headers }
    }

    /// Headers for one response.
    pub fn headers_for(&self, nonce: Option<&CspNonce>) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(self.static_headers.len() + 2);
        for (name, value) in &self.static_headers {
            headers.insert(name.clone(), value.clone());
        }

        // base64 and the fixed policy text are always valid header values
        if let Ok(csp) = HeaderValue::try_from(content_security_policy(nonce)) {
            headers.insert(CONTENT_SECURITY_POLICY, csp);
        }
        if let Some(value) = nonce.and_then(|n| HeaderValue::from_str(n.as_str()).ok()) {
            headers.insert(X_NONCE, value);
        }
        headers
    }
}

/// Copy `source` into `target`, overwriting same-named headers.
pub fn apply_headers(target: &mut HeaderMap, source: &HeaderMap) {
    for (name, value) in source {
        target.insert(name.clone(), value.clone());
    }
}

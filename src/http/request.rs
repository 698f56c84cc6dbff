//! Request inspection.
//!
//! # Responsibilities
//! - Extract everything the gate decides on (host, path, scheme, origin, client IP)
//! - Resolve and normalize the client IP
//!
//! # Design Decisions
//! - Extracted once per request into an owned `RequestFacts`, so decisions are
//!   plain functions of data and testable without a live request
//! - The client IP is never empty; `"unknown"` keeps rate-limit keys well-formed
//! - Origin/Referer values that are not visible ASCII become empty strings so
//!   they fail validation instead of looking absent

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::header::{HOST, ORIGIN, REFERER};
use axum::http::{Extensions, HeaderMap, HeaderName, Method, Request, Uri};

/// Request ID header set and propagated by the server.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Client IP used when no source yields one.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Everything the gate needs to know about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFacts {
    pub method: Method,
    pub host: Option<String>,
    pub path: String,
    pub query: Option<String>,
    /// Scheme the client used, when known.
    pub scheme: Option<String>,
    pub origin: Option<String>,
    pub referer: Option<String>,
    pub client_ip: String,
}

impl RequestFacts {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::build(
            request.method(),
            request.uri(),
            request.headers(),
            request.extensions(),
        )
    }

    pub fn from_parts(parts: &axum::http::request::Parts) -> Self {
        Self::build(&parts.method, &parts.uri, &parts.headers, &parts.extensions)
    }

    fn build(method: &Method, uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> Self {
        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()));

        let peer = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Self {
            method: method.clone(),
            host,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            scheme: forwarded_proto(headers).or_else(|| uri.scheme_str().map(str::to_ascii_lowercase)),
            origin: strict_header(headers, &ORIGIN),
            referer: strict_header(headers, &REFERER),
            client_ip: client_ip(headers, peer),
        }
    }

    /// `scheme://host` the request was addressed to.
    pub fn request_url(&self, default_scheme: &str) -> Option<String> {
        let host = self.host.as_deref()?;
        let scheme = self.scheme.as_deref().unwrap_or(default_scheme);
        Some(format!("{scheme}://{host}"))
    }
}

/// Client identity: first `X-Forwarded-For` entry, `X-Real-Ip`, the socket peer, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(normalize_ip);

    forwarded
        .or_else(|| {
            headers
                .get(X_REAL_IP)
                .and_then(|v| v.to_str().ok())
                .and_then(normalize_ip)
        })
        .or_else(|| peer.map(|ip| canonical_ip(ip).to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Parse an IP (optionally with port or IPv6 brackets) into canonical text.
pub fn normalize_ip(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let ip = raw
        .parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
        .or_else(|| {
            raw.strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .and_then(|r| r.parse::<IpAddr>().ok())
        })?;
    Some(canonical_ip(ip).to_string())
}

fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

fn forwarded_proto(headers: &HeaderMap) -> Option<String> {
    let proto = headers
        .get(X_FORWARDED_PROTO)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .to_ascii_lowercase();
    matches!(proto.as_str(), "http" | "https").then_some(proto)
}

fn strict_header(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|v| v.to_str().map(str::to_string).unwrap_or_default())
}

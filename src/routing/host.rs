//! Main-site / admin-site host isolation.
//!
//! # Responsibilities
//! - Parse the configured admin host (bare host or URL)
//! - Compare it to the request's `Host` header
//! - Build the temporary redirect to the admin host
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores default ports
//! - Pure function of (request, static config); no state
//! - Redirects are temporary (302) because the policy is runtime-configurable

use std::str::FromStr;

use axum::http::uri::Authority;
use url::Url;

use crate::config::HostRoutingConfig;
use crate::routing::matcher::{PathClass, PathClassifier};

/// Outcome of host routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostDecision {
    Pass,
    Redirect(String),
}

/// Parsed admin host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminHost {
    host: String,
    port: Option<u16>,
    scheme: Option<String>,
}

impl AdminHost {
    /// Accepts `admin.example.com`, `admin.example.com:8443` or `https://admin.example.com/`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.contains("://") {
            let url = Url::parse(raw).ok()?;
            if !matches!(url.scheme(), "http" | "https") {
                return None;
            }
            let host = url.host_str()?.to_ascii_lowercase();
            return Some(Self {
                host,
                port: url.port(),
                scheme: Some(url.scheme().to_string()),
            });
        }

        let (host, port) = split_authority(raw)?;
        Some(Self {
            host,
            port,
            scheme: None,
        })
    }

    /// `host[:port]` as it appears in a redirect target.
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    fn matches(&self, request_host: &str, scheme: &str) -> bool {
        let Some((host, port)) = split_authority(request_host) else {
            return false;
        };
        let default = default_port(scheme);
        host == self.host && port.or(default) == self.port.or(default)
    }
}

/// Decides whether a request must move to the admin host.
#[derive(Debug, Clone)]
pub struct HostRouter {
    admin_host: Option<AdminHost>,
    allow_admin_on_main_site: bool,
    default_scheme: String,
}

impl HostRouter {
    /// An unparseable admin host disables isolation; validation rejects such configs up front.
    pub fn new(config: &HostRoutingConfig) -> Self {
        Self {
            admin_host: config.admin_host.as_deref().and_then(AdminHost::parse),
            allow_admin_on_main_site: config.allow_admin_on_main_site,
            default_scheme: config.default_scheme.clone(),
        }
    }

    /// Whether host isolation is active at all.
    pub fn is_enforcing(&self) -> bool {
        self.admin_host.is_some() && !self.allow_admin_on_main_site
    }

    /// Route a request already classified by [`PathClassifier`].
    ///
    /// `scheme` is the scheme the client used, when known (forwarded proto or absolute URI).
    pub fn route(
        &self,
        class: PathClass,
        request_host: Option<&str>,
        path: &str,
        query: Option<&str>,
        scheme: Option<&str>,
    ) -> HostDecision {
        if !class.is_admin_scoped() || self.allow_admin_on_main_site {
            return HostDecision::Pass;
        }
        let Some(admin) = &self.admin_host else {
            return HostDecision::Pass;
        };

        let scheme = scheme
            .or(admin.scheme.as_deref())
            .unwrap_or(&self.default_scheme);

        if request_host.is_some_and(|host| admin.matches(host, scheme)) {
            return HostDecision::Pass;
        }

        let mut target = format!("{}://{}{}", scheme, admin.authority(), path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }
        HostDecision::Redirect(target)
    }

    /// Convenience wrapper that classifies the path first.
    pub fn route_path(
        &self,
        classifier: &PathClassifier,
        request_host: Option<&str>,
        path: &str,
        query: Option<&str>,
        scheme: Option<&str>,
    ) -> HostDecision {
        self.route(classifier.classify(path), request_host, path, query, scheme)
    }
}

fn split_authority(raw: &str) -> Option<(String, Option<u16>)> {
    let authority = Authority::from_str(raw.trim()).ok()?;
    // userinfo has no business in a Host header or admin host
    if authority.as_str().contains('@') {
        return None;
    }
    let host = authority.host().trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some((host, authority.port_u16()))
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

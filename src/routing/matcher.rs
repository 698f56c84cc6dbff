//! Path classification.
//!
//! # Responsibilities
//! - Decide which surface a request path belongs to (admin, auth, API, public)
//! - Map a path to its rate-limit route class
//!
//! # Design Decisions
//! - Path matching is case-sensitive and segment-aware: `/admin` matches
//!   `/admin` and `/admin/videos`, never `/administrator`
//! - The auth callback is checked first so it can never become admin-scoped
//! - No regex to guarantee O(n) matching

use std::fmt;

use crate::config::HostRoutingConfig;

/// Surface a request path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Under one of the admin prefixes.
    Admin,
    /// Auth endpoint specific to admins (path mentions "admin" or "login").
    AdminAuth,
    /// The authentication callback; reachable on every host.
    AuthCallback,
    /// Any other auth endpoint (token refresh, logout, ...).
    Auth,
    /// JSON API.
    Api,
    /// Everything else.
    Public,
}

impl PathClass {
    /// Subject to host isolation and the admin rate budget.
    pub fn is_admin_scoped(self) -> bool {
        matches!(self, PathClass::Admin | PathClass::AdminAuth)
    }

    /// Rate-limit route class, if the path is rate limited at all.
    pub fn rate_class(self) -> Option<RouteClass> {
        match self {
            PathClass::Admin | PathClass::AdminAuth => Some(RouteClass::Admin),
            PathClass::AuthCallback | PathClass::Auth | PathClass::Api => Some(RouteClass::Api),
            PathClass::Public => None,
        }
    }
}

/// Coarse label used in rate-limit keys so each surface gets its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Admin,
    Api,
}

impl RouteClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteClass::Admin => "admin",
            RouteClass::Api => "api",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies request paths. Compiled once from config, immutable afterwards.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    admin_prefixes: Vec<String>,
    auth_prefix: String,
    auth_callback_path: String,
    api_prefix: String,
}

impl PathClassifier {
    pub fn new(config: &HostRoutingConfig) -> Self {
        Self {
            admin_prefixes: config.admin_prefixes.iter().map(|p| trim_prefix(p)).collect(),
            auth_prefix: trim_prefix(&config.auth_prefix),
            auth_callback_path: trim_prefix(&config.auth_callback_path),
            api_prefix: trim_prefix(&config.api_prefix),
        }
    }

    pub fn classify(&self, path: &str) -> PathClass {
        if is_under(path, &self.auth_callback_path) {
            return PathClass::AuthCallback;
        }

        if is_under(path, &self.auth_prefix) {
            let rest = path[self.auth_prefix.len()..].to_ascii_lowercase();
            return if rest.contains("admin") || rest.contains("login") {
                PathClass::AdminAuth
            } else {
                PathClass::Auth
            };
        }

        if self.admin_prefixes.iter().any(|p| is_under(path, p)) {
            return PathClass::Admin;
        }

        if is_under(path, &self.api_prefix) {
            return PathClass::Api;
        }

        PathClass::Public
    }
}

fn trim_prefix(prefix: &str) -> String {
    prefix.trim_end_matches('/').to_string()
}

/// `prefix` has no trailing slash; the empty prefix (configured as "/") matches everything.
fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new(&HostRoutingConfig::default())
    }

    #[test]
    fn test_admin_prefixes() {
        let c = classifier();
        assert_eq!(c.classify("/admin"), PathClass::Admin);
        assert_eq!(c.classify("/admin/"), PathClass::Admin);
        assert_eq!(c.classify("/admin/videos"), PathClass::Admin);
        assert_eq!(c.classify("/api/admin/videos/42"), PathClass::Admin);
        assert_eq!(c.classify("/administrator"), PathClass::Public);
        assert_eq!(c.classify("/Admin/videos"), PathClass::Public);
    }

    #[test]
    fn test_auth_paths() {
        let c = classifier();
        assert_eq!(c.classify("/api/auth/callback"), PathClass::AuthCallback);
        assert_eq!(c.classify("/api/auth/callback/credentials"), PathClass::AuthCallback);
        assert_eq!(c.classify("/api/auth/admin-login"), PathClass::AdminAuth);
        assert_eq!(c.classify("/api/auth/Login"), PathClass::AdminAuth);
        assert_eq!(c.classify("/api/auth/refresh"), PathClass::Auth);
        assert_eq!(c.classify("/api/auth/logout"), PathClass::Auth);
    }

    #[test]
    fn test_api_and_public() {
        let c = classifier();
        assert_eq!(c.classify("/api/photos"), PathClass::Api);
        assert_eq!(c.classify("/api"), PathClass::Api);
        assert_eq!(c.classify("/apiary"), PathClass::Public);
        assert_eq!(c.classify("/videos/123"), PathClass::Public);
        assert_eq!(c.classify("/"), PathClass::Public);
    }

    #[test]
    fn test_scope_and_rate_class() {
        assert!(PathClass::Admin.is_admin_scoped());
        assert!(PathClass::AdminAuth.is_admin_scoped());
        assert!(!PathClass::AuthCallback.is_admin_scoped());
        assert_eq!(PathClass::AdminAuth.rate_class(), Some(RouteClass::Admin));
        assert_eq!(PathClass::Auth.rate_class(), Some(RouteClass::Api));
        assert_eq!(PathClass::Public.rate_class(), None);
    }

    #[test]
    fn test_trailing_slash_in_config() {
        let mut config = HostRoutingConfig::default();
        config.admin_prefixes = vec!["/cms/".to_string()];
        let c = PathClassifier::new(&config);
        assert_eq!(c.classify("/cms"), PathClass::Admin);
        assert_eq!(c.classify("/cms/pages"), PathClass::Admin);
        assert_eq!(c.classify("/admin"), PathClass::Public);
    }
}

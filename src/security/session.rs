//! Caller sessions and the admin guard.
//!
//! # Token Format
//! ```text
//! base64url(JSON CallerSession) "." base64url(HMAC-SHA256(secret, first part))
//! ```
//! Carried in the session cookie or an `Authorization: Bearer` header.
//!
//! # Design Decisions
//! - Sessions are read-only here; issuing happens at login
//! - Signature check is constant-time (`Mac::verify_slice`)
//! - Any defect (bad signature, bad JSON, unknown role, expiry) means "no session"
//! - The guard at the edge is advisory; privileged handlers re-derive the session
//!   through the `AdminSession` extractor instead of trusting anything the edge set

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::validation::MIN_SESSION_SECRET_LEN;
use crate::config::SessionConfig;

type HmacSha256 = Hmac<Sha256>;

/// Role marker stored in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    None,
}

/// Identity of the caller, reconstructed per request from a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerSession {
    pub role: Role,
    pub client_ip: String,
    /// Unix seconds.
    pub login_time: u64,
}

impl CallerSession {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Why a token did not yield a session. Only ever logged.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,

    #[error("session signature mismatch")]
    BadSignature,

    #[error("session expired")]
    Expired,

    #[error("invalid session payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid session key")]
    Key,
}

/// Why the admin guard refused a caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unauthorized {
    #[error("no session")]
    NoSession,

    #[error("session role is not admin")]
    NotAdmin,

    #[error("session bound to another client IP")]
    IpMismatch,
}

/// Resolves the caller's session from request headers.
pub trait SessionResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<CallerSession>;
}

/// Session must exist and carry the admin role.
pub fn require_admin(session: Option<&CallerSession>) -> Result<&CallerSession, Unauthorized> {
    match session {
        None => Err(Unauthorized::NoSession),
        Some(session) if session.is_admin() => Ok(session),
        Some(_) => Err(Unauthorized::NotAdmin),
    }
}

/// Admin check plus optional client-IP binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionGuard {
    bind_to_client_ip: bool,
}

impl SessionGuard {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            bind_to_client_ip: config.bind_to_client_ip,
        }
    }

    pub fn authorize(
        &self,
        session: Option<CallerSession>,
        client_ip: &str,
    ) -> Result<CallerSession, Unauthorized> {
        let session = session.ok_or(Unauthorized::NoSession)?;
        require_admin(Some(&session))?;
        if self.bind_to_client_ip && session.client_ip != client_ip {
            return Err(Unauthorized::IpMismatch);
        }
        Ok(session)
    }
}

/// HMAC-signed session tokens.
#[derive(Clone)]
pub struct SignedSessionResolver {
    key: Vec<u8>,
    cookie_name: String,
    max_age: Duration,
}

impl std::fmt::Debug for SignedSessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedSessionResolver")
            .field("cookie_name", &self.cookie_name)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl SignedSessionResolver {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            key: config.secret.as_bytes().to_vec(),
            cookie_name: config.cookie_name.clone(),
            max_age: Duration::from_secs(config.max_age_secs),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Mint a token for `session`.
    pub fn issue(&self, session: &CallerSession) -> Result<String, SessionError> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(session)?);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<CallerSession, SessionError> {
        self.verify_at(token, unix_now())
    }

    /// Verify a token as of `now` (unix seconds).
    pub fn verify_at(&self, token: &str, now: u64) -> Result<CallerSession, SessionError> {
        let (payload, signature) = token.trim().split_once('.').ok_or(SessionError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let session: CallerSession = serde_json::from_slice(&json)?;

        if session.login_time.saturating_add(self.max_age.as_secs()) <= now {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        // an unvalidated config must not turn into a guessable key
        if self.key.len() < MIN_SESSION_SECRET_LEN {
            return Err(SessionError::Key);
        }
        HmacSha256::new_from_slice(&self.key).map_err(|_| SessionError::Key)
    }

    /// Candidate tokens, cookie first then bearer.
    fn tokens_from<'a>(&'a self, headers: &'a HeaderMap) -> impl Iterator<Item = &'a str> + 'a {
        let from_cookie = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value);

        let from_bearer = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        from_cookie.into_iter().chain(from_bearer)
    }
}

impl SessionResolver for SignedSessionResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<CallerSession> {
        self.tokens_from(headers).find_map(|token| match self.verify(token) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                None
            }
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn resolver() -> SignedSessionResolver {
        SignedSessionResolver::new(&SessionConfig {
            secret: "0123456789abcdef0123456789abcdef".to_string(),
            max_age_secs: 3600,
            ..SessionConfig::default()
        })
    }

    fn admin(login_time: u64) -> CallerSession {
        CallerSession {
            role: Role::Admin,
            client_ip: "203.0.113.7".to_string(),
            login_time,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let r = resolver();
        let token = r.issue(&admin(1_000)).unwrap();
        assert_eq!(r.verify_at(&token, 1_500).unwrap(), admin(1_000));
    }

    #[test]
    fn test_expired_token() {
        let r = resolver();
        let token = r.issue(&admin(1_000)).unwrap();
        assert!(matches!(r.verify_at(&token, 4_600), Err(SessionError::Expired)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let r = resolver();
        let token = r.issue(&CallerSession { role: Role::None, ..admin(1_000) }).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&admin(1_000)).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(r.verify_at(&forged, 1_500), Err(SessionError::BadSignature)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = resolver().issue(&admin(1_000)).unwrap();
        let other = SignedSessionResolver::new(&SessionConfig {
            secret: "ffffffffffffffffffffffffffffffff".to_string(),
            ..SessionConfig::default()
        });
        assert!(matches!(other.verify_at(&token, 1_500), Err(SessionError::BadSignature)));
    }

    #[test]
    fn test_garbage_tokens() {
        let r = resolver();
        for token in ["", "abc", "abc.def", "!!!.???"] {
            assert!(r.verify_at(token, 0).is_err(), "{token}");
        }
    }

    #[test]
    fn test_resolve_from_cookie_and_bearer() {
        let r = resolver();
        let token = r.issue(&CallerSession { login_time: unix_now(), ..admin(0) }).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; site_session={token}; other=1")).unwrap(),
        );
        assert!(r.resolve(&headers).unwrap().is_admin());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        assert!(r.resolve(&headers).unwrap().is_admin());

        assert!(r.resolve(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_stale_cookie_falls_back_to_bearer() {
        let r = resolver();
        let token = r.issue(&CallerSession { login_time: unix_now(), ..admin(0) }).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("site_session=expired.garbage"));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        assert!(r.resolve(&headers).unwrap().is_admin());

        headers.remove(AUTHORIZATION);
        assert!(r.resolve(&headers).is_none());
    }

    #[test]
    fn test_short_key_never_signs_or_verifies() {
        let weak = SignedSessionResolver::new(&SessionConfig::default());
        assert!(matches!(weak.issue(&admin(1_000)), Err(SessionError::Key)));

        let token = resolver().issue(&admin(1_000)).unwrap();
        assert!(matches!(weak.verify_at(&token, 1_500), Err(SessionError::Key)));
    }

    #[test]
    fn test_require_admin() {
        let admin = admin(0);
        let user = CallerSession { role: Role::None, ..admin.clone() };

        assert_eq!(require_admin(Some(&admin)), Ok(&admin));
        assert_eq!(require_admin(Some(&user)), Err(Unauthorized::NotAdmin));
        assert_eq!(require_admin(None), Err(Unauthorized::NoSession));
    }

    #[test]
    fn test_guard_ip_binding() {
        let guard = SessionGuard { bind_to_client_ip: true };
        assert!(guard.authorize(Some(admin(0)), "203.0.113.7").is_ok());
        assert_eq!(
            guard.authorize(Some(admin(0)), "198.51.100.1"),
            Err(Unauthorized::IpMismatch)
        );

        let guard = SessionGuard::default();
        assert!(guard.authorize(Some(admin(0)), "198.51.100.1").is_ok());
    }
}

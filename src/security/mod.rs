//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Every request (driven by gate::request_gate):
//!     → rate_limit.rs (per route class, per client IP budget)
//!     → headers.rs (CSP nonce + defensive headers)
//!
//! State-changing handlers (gate::mutation_guard / AdminSession):
//!     → origin.rs (trusted Origin / Referer)
//!     → session.rs (admin role from signed session)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: edge checks are repeated inside privileged handlers
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod clock;
pub mod headers;
pub mod origin;
pub mod rate_limit;
pub mod session;

pub use clock::{Clock, MockClock, SystemClock};
pub use headers::{generate_nonce, CspNonce, HeaderInjector, NonceError, X_NONCE};
pub use origin::{normalize_origin, AllowedOrigins, OriginRejection, OriginValidator};
pub use rate_limit::{bucket_key, MemoryRateLimiter, RateLimitOutcome, RateLimitStore};
pub use session::{
    require_admin, CallerSession, Role, SessionGuard, SessionResolver, SignedSessionResolver,
    Unauthorized,
};

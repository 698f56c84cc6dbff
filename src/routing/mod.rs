//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, query)
//!     → matcher.rs (classify path: admin / auth / api / public)
//!     → host.rs (admin-scoped path on the wrong host?)
//!     → Return: Pass or Redirect(target)
//!
//! Compilation (at startup):
//!     HostRoutingConfig
//!     → trim prefixes, parse admin host
//!     → Freeze as immutable PathClassifier + HostRouter
//! ```
//!
//! # Design Decisions
//! - Compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields the same decision

pub mod host;
pub mod matcher;

pub use host::{AdminHost, HostDecision, HostRouter};
pub use matcher::{PathClass, PathClassifier, RouteClass};

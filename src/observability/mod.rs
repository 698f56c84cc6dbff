//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gate, security, lifecycle produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every request span
//! - Metrics are cheap (atomic increments)
//! - Secrets and session tokens are never logged

pub mod logging;
pub mod metrics;
pub mod tracing;

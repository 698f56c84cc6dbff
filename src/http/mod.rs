//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout, body limit)
//!     → request.rs (extract RequestFacts: host, path, origin, client IP)
//!     → [gate decides: redirect / 429 / pass]
//!     → application router
//!     → response.rs (rejection bodies, redirects)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestFacts, X_REQUEST_ID};
pub use response::GateRejection;
pub use server::{build_router, HttpServer};

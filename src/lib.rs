//! Edge request gate for a content site with an admin CMS.
//!
//! Every inbound request passes one policy chain before any business logic:
//! admin host isolation, per-client rate limiting and security headers.
//! Privileged handlers additionally check the request origin and the caller's
//! admin session.

pub mod admin;
pub mod app;
pub mod config;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GateConfig;
pub use gate::{Gate, GateDecision};
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (GATE_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - No component reads the environment on its own
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, load_from_env, ConfigError};
pub use schema::{
    GateConfig, HostRoutingConfig, ListenerConfig, ObservabilityConfig, OriginConfig,
    RateLimitConfig, RouteLimit, SecurityConfig, SessionConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};

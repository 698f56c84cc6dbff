//! Site gate
//!
//! Fronts the site with the request gate.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                    SITE GATE                     │
//!                      │                                                  │
//!   Client Request     │  ┌─────────┐   ┌───────────┐   ┌─────────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│   gate    │──▶│ application │  │
//!                      │  │ server  │   │  decide   │   │   router    │  │
//!                      │  └─────────┘   └─────┬─────┘   └──────┬──────┘  │
//!                      │                      │                │         │
//!   Client Response    │     302 / 429 / 500  │                │         │
//!   ◀──────────────────┼──────────────────────┘   admin routes: │         │
//!                      │                          origin + session guard  │
//!                      │                                                  │
//!                      │  ┌────────────────────────────────────────────┐  │
//!                      │  │            Cross-Cutting Concerns           │  │
//!                      │  │  config · observability · lifecycle         │  │
//!                      │  └────────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use site_gate::config::{load_config, load_from_env, ObservabilityConfig};
use site_gate::lifecycle::startup;
use site_gate::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "site-gate", version, about = "Edge request gate for the site")]
struct Cli {
    /// TOML configuration file; defaults plus GATE_* environment when omitted
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => load_config(path),
        None => load_from_env(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "site-gate starting");

    startup::run(config).await?;
    Ok(())
}

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN};

use site_gate::config::{load_config, load_from_env, GateConfig};
use site_gate::routing::{HostDecision, HostRouter, PathClassifier};

const REDACTED: &str = "<redacted>";

/// Response headers worth showing when probing a gated site.
const PROBED_HEADERS: &[&str] = &[
    "content-security-policy",
    "x-nonce",
    "strict-transport-security",
    "x-frame-options",
    "x-content-type-options",
    "referrer-policy",
    "permissions-policy",
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "retry-after",
    "location",
    "x-request-id",
];

#[derive(Parser)]
#[command(name = "gatectl")]
#[command(about = "Operator tool for the site gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print the effective configuration
    CheckConfig {
        /// Omit to check defaults plus GATE_* environment
        path: Option<PathBuf>,
    },
    /// Show how the gate classifies and routes a path
    Classify {
        path: String,

        /// Host header of the hypothetical request
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// GET a URL and print status plus security headers
    Probe {
        url: String,

        /// Origin header to send
        #[arg(long)]
        origin: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig { path } => {
            let mut config = load(path.as_deref())?;
            config.session.secret = REDACTED.to_string();
            println!("{}", toml::to_string_pretty(&config)?);
            eprintln!("Configuration OK");
        }
        Commands::Classify { path, host, config } => {
            let config = load(config.as_deref())?;
            let classifier = PathClassifier::new(&config.host_routing);
            let router = HostRouter::new(&config.host_routing);

            let (path, query) = match path.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (path, None),
            };
            let class = classifier.classify(&path);

            println!("path:       {path}");
            println!("class:      {class:?}");
            match class.rate_class() {
                Some(rate_class) => println!("rate class: {rate_class}"),
                None => println!("rate class: none"),
            }
            match router.route(class, host.as_deref(), &path, query.as_deref(), None) {
                HostDecision::Pass => println!("host:       pass"),
                HostDecision::Redirect(target) => println!("host:       302 -> {target}"),
            }
        }
        Commands::Probe { url, origin } => {
            let mut headers = HeaderMap::new();
            headers.insert(
                "x-request-id",
                HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())?,
            );
            if let Some(origin) = origin {
                headers.insert(ORIGIN, HeaderValue::from_str(&origin)?);
            }

            let client = reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()?;
            let res = client.get(&url).headers(headers).send().await?;

            println!("{} {}", res.status(), url);
            for name in PROBED_HEADERS {
                if let Some(value) = res.headers().get(*name) {
                    println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
                }
            }
        }
    }

    Ok(())
}

fn load(path: Option<&Path>) -> Result<GateConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    Ok(config)
}

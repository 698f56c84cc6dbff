//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GateConfig = toml::from_str(&content)?;
    finish(&mut config)?;
    Ok(config)
}

/// Defaults plus environment overrides, for running without a config file.
pub fn load_from_env() -> Result<GateConfig, ConfigError> {
    let mut config = GateConfig::default();
    finish(&mut config)?;
    Ok(config)
}

fn finish(config: &mut GateConfig) -> Result<(), ConfigError> {
    apply_env_overrides(config, |var| std::env::var(var).ok())?;
    validate_config(config).map_err(ConfigError::Validation)
}

/// Override file values with environment-style inputs.
///
/// `lookup` returns the raw value of a variable, if set. Empty values count as unset.
pub fn apply_env_overrides<F>(config: &mut GateConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("GATE_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = get("GATE_ADMIN_HOST") {
        config.host_routing.admin_host = Some(v);
    }
    if let Some(v) = get("GATE_ALLOW_ADMIN_ON_MAIN_SITE") {
        config.host_routing.allow_admin_on_main_site = parse_bool("GATE_ALLOW_ADMIN_ON_MAIN_SITE", &v)?;
    }
    if let Some(v) = get("GATE_RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = parse_bool("GATE_RATE_LIMIT_ENABLED", &v)?;
    }
    if let Some(v) = get("GATE_ADMIN_MAX_REQUESTS") {
        config.rate_limit.admin.max_requests = parse_num("GATE_ADMIN_MAX_REQUESTS", &v)?;
    }
    if let Some(v) = get("GATE_ADMIN_WINDOW_MS") {
        config.rate_limit.admin.window_ms = parse_num("GATE_ADMIN_WINDOW_MS", &v)?;
    }
    if let Some(v) = get("GATE_API_MAX_REQUESTS") {
        config.rate_limit.api.max_requests = parse_num("GATE_API_MAX_REQUESTS", &v)?;
    }
    if let Some(v) = get("GATE_API_WINDOW_MS") {
        config.rate_limit.api.window_ms = parse_num("GATE_API_WINDOW_MS", &v)?;
    }
    if let Some(v) = get("GATE_APP_URL") {
        config.origins.app_url = Some(v);
    }
    if let Some(v) = get("GATE_PLATFORM_URL") {
        config.origins.platform_url = Some(v);
    }
    if let Some(v) = get("GATE_ALLOWED_ORIGINS") {
        config.origins.allowed = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = get("GATE_SESSION_SECRET") {
        config.session.secret = v;
    }

    Ok(())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = GateConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("GATE_ADMIN_HOST", "admin.example.com"),
                ("GATE_ALLOW_ADMIN_ON_MAIN_SITE", "true"),
                ("GATE_ADMIN_MAX_REQUESTS", "7"),
                ("GATE_API_WINDOW_MS", "30000"),
                ("GATE_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
            ]),
        )
        .unwrap();

        assert_eq!(config.host_routing.admin_host.as_deref(), Some("admin.example.com"));
        assert!(config.host_routing.allow_admin_on_main_site);
        assert_eq!(config.rate_limit.admin.max_requests, 7);
        assert_eq!(config.rate_limit.api.window_ms, 30_000);
        assert_eq!(config.origins.allowed, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = GateConfig::default();
        apply_env_overrides(&mut config, lookup_from(&[("GATE_ADMIN_HOST", "  ")])).unwrap();
        assert!(config.host_routing.admin_host.is_none());
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = GateConfig::default();
        let err = apply_env_overrides(
            &mut config,
            lookup_from(&[("GATE_RATE_LIMIT_ENABLED", "maybe")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "GATE_RATE_LIMIT_ENABLED", .. }));

        let err = apply_env_overrides(
            &mut config,
            lookup_from(&[("GATE_API_MAX_REQUESTS", "-3")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "GATE_API_MAX_REQUESTS", .. }));
    }
}

//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{DashboardConfig, DEFAULT_BASE_PORT};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Defaults(#[from] toml::ser::Error),

    #[error("Invalid PORT value `{0}`")]
    BasePort(String),

    #[error("Configuration file is empty")]
    Empty,

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Base port for default listener addresses, from the `PORT` variable.
pub fn base_port_from_env() -> Result<u16, ConfigError> {
    match std::env::var("PORT") {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::BasePort(value)),
        Err(_) => Ok(DEFAULT_BASE_PORT),
    }
}

/// Parse and validate a TOML document.
///
/// Listener addresses missing from the document are laid out from
/// `base_port`.
pub fn parse_config(content: &str, base_port: u16) -> Result<DashboardConfig, ConfigError> {
    let mut document: toml::Table = toml::from_str(content)?;
    if let toml::Value::Table(defaults) =
        toml::Value::try_from(DashboardConfig::with_base_port(base_port))?
    {
        merge_missing(&mut document, defaults);
    }

    let config: DashboardConfig = toml::Value::Table(document).try_into()?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DashboardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, base_port_from_env()?)
}

/// Load a changed configuration file for a hot reload.
///
/// Unlike [`load_config`], a blank document is an error: editors that
/// truncate before writing would otherwise reload onto all defaults.
pub fn reload_config(path: &Path) -> Result<DashboardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Err(ConfigError::Empty);
    }
    parse_config(&content, base_port_from_env()?)
}

fn merge_missing(target: &mut toml::Table, defaults: toml::Table) {
    for (key, value) in defaults {
        match (target.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_missing(existing, nested);
            }
            (Some(_), _) => {}
            (None, value) => {
                target.insert(key, value);
            }
        }
    }
}

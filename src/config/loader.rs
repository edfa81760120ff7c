//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::LoggingConfig;
use crate::config::validation::ConfigValidator;
use crate::error::{Error, Result};

/// Load and validate configuration from a TOML file.
///
/// The file may hold the fields at the top level or under a `[logging]` table.
pub fn load_config(path: &Path, validator: &ConfigValidator) -> Result<LoggingConfig> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    validator.validate(&config).map_err(Error::Config)?;

    Ok(config)
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<LoggingConfig> {
    #[derive(serde::Deserialize)]
    struct Wrapped {
        logging: LoggingConfig,
    }

    let value: toml::Table = toml::from_str(content)?;
    if value.contains_key("logging") {
        let wrapped: Wrapped = toml::from_str(content)?;
        Ok(wrapped.logging)
    } else {
        Ok(toml::from_str(content)?)
    }
}

//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::Configuration;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the configuration for a command.
///
/// Held by [`crate::Bootstrap`] so applications and tests can swap the source.
pub trait ConfigurationFactory: Send + Sync {
    fn build(&self, path: Option<&Path>) -> Result<Configuration, ConfigError>;
}

/// Loads TOML files; a missing path yields the defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlConfigurationFactory;

impl ConfigurationFactory for TomlConfigurationFactory {
    fn build(&self, path: Option<&Path>) -> Result<Configuration, ConfigError> {
        match path {
            Some(path) => load_config(path),
            None => {
                let config = Configuration::default();
                validate_config(&config).map_err(ConfigError::Validation)?;
                Ok(config)
            }
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Configuration, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Configuration, ConfigError> {
    let config: Configuration = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

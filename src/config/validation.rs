//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate connector addresses and TLS material
//! - Validate context paths and log levels
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Configuration → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{Configuration, ConnectorConfig, ConnectorType};
use crate::http::handler::{normalize_prefix, validate_path};
use crate::observability::logging::LogLevel;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("connector address '{0}' is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("https connector '{0}' requires cert_path and key_path")]
    MissingTlsMaterial(String),

    #[error("context path '{0}' must be an absolute path without parameters")]
    InvalidContextPath(String),

    #[error("unknown log level '{level}' for logger '{logger}'")]
    UnknownLogLevel { logger: String, level: String },
}

/// Validate a loaded configuration.
pub fn validate_config(config: &Configuration) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let server = &config.server;
    for connector in server
        .application_connectors
        .iter()
        .chain(server.admin_connectors.iter())
    {
        validate_connector(connector, &mut errors);
    }

    for path in [&server.application_context_path, &server.admin_context_path] {
        if !path.starts_with('/') || validate_path(&normalize_prefix(path)).is_err() {
            errors.push(ValidationError::InvalidContextPath(path.clone()));
        }
    }

    if config.logging.level.parse::<LogLevel>().is_err() {
        errors.push(ValidationError::UnknownLogLevel {
            logger: "ROOT".to_string(),
            level: config.logging.level.clone(),
        });
    }
    for (logger, level) in &config.logging.loggers {
        if level.parse::<LogLevel>().is_err() {
            errors.push(ValidationError::UnknownLogLevel {
                logger: logger.clone(),
                level: level.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_connector(connector: &ConnectorConfig, errors: &mut Vec<ValidationError>) {
    if connector.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(connector.bind_address.clone()));
    }
    if connector.kind == ConnectorType::Https
        && (connector.cert_path.is_none() || connector.key_path.is_none())
    {
        errors.push(ValidationError::MissingTlsMaterial(connector.bind_address.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Configuration::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = Configuration::default();
        config.server.admin_connectors[0].bind_address = "localhost".into();
        config.server.admin_context_path = "admin".into();
        config.server.application_connectors[0].kind = ConnectorType::Https;
        config.logging.level = "LOUD".into();
        config.logging.loggers.insert("gantry::admin".into(), "debug".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidBindAddress("localhost".into())));
        assert!(errors.contains(&ValidationError::InvalidContextPath("admin".into())));
        assert!(errors.contains(&ValidationError::MissingTlsMaterial("0.0.0.0:8080".into())));
        assert!(errors.contains(&ValidationError::UnknownLogLevel {
            logger: "ROOT".into(),
            level: "LOUD".into(),
        }));
    }

    #[test]
    fn test_context_paths_must_be_routable() {
        for path in ["/admin/:env", "/a//b", "/{tenant}", "/static/*rest"] {
            let mut config = Configuration::default();
            config.server.admin_context_path = path.into();
            assert_eq!(
                validate_config(&config),
                Err(vec![ValidationError::InvalidContextPath(path.into())])
            );
        }

        let mut config = Configuration::default();
        config.server.application_context_path = "/api/".into();
        config.server.admin_context_path = "/".into();
        assert!(validate_config(&config).is_ok());
    }
}

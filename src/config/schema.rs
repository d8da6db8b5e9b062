//! Configuration schema definitions.
//!
//! This module defines the configuration structure shared by every
//! application. All types derive Serde traits for deserialization from config
//! files. Tables the framework does not know about are kept in
//! [`Configuration::extra`] so applications can carry their own sections.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Root configuration for an application run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Configuration {
    /// Connectors and context paths.
    pub server: ServerConfig,

    /// Root and per-logger levels.
    pub logging: LoggingConfig,

    /// Metrics reporting settings.
    pub metrics: MetricsConfig,

    /// Application-specific sections.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Configuration {
    /// Deserialize an application-specific top-level section.
    ///
    /// Returns `Ok(None)` when the section is absent.
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, toml::de::Error> {
        match self.extra.get(name) {
            Some(value) => value.clone().try_into().map(Some),
            None => Ok(None),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Connectors serving application routes.
    pub application_connectors: Vec<ConnectorConfig>,

    /// Connectors serving the admin surface.
    pub admin_connectors: Vec<ConnectorConfig>,

    /// Path prefix for application routes.
    pub application_context_path: String,

    /// Path prefix for admin routes.
    pub admin_context_path: String,

    /// Request timeout for application routes in seconds.
    pub request_timeout_secs: u64,

    /// How long connectors may drain in-flight requests after shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application_connectors: vec![ConnectorConfig::http("0.0.0.0:8080")],
            admin_connectors: vec![ConnectorConfig::http("127.0.0.1:8081")],
            application_context_path: "/".to_string(),
            admin_context_path: "/".to_string(),
            request_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Transport used by a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    #[default]
    Http,
    Https,
}

/// A single listening socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectorConfig {
    /// `http` or `https`.
    #[serde(rename = "type", default)]
    pub kind: ConnectorType,

    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path to certificate file (PEM), https only.
    #[serde(default)]
    pub cert_path: Option<String>,

    /// Path to private key file (PEM), https only.
    #[serde(default)]
    pub key_path: Option<String>,
}

impl ConnectorConfig {
    /// Plain HTTP connector on the given address.
    pub fn http(bind_address: impl Into<String>) -> Self {
        Self {
            kind: ConnectorType::Http,
            bind_address: bind_address.into(),
            cert_path: None,
            key_path: None,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Root level (ALL, TRACE, DEBUG, INFO, WARN, ERROR, OFF).
    pub level: String,

    /// Subscriber output format.
    pub format: LogFormat,

    /// Per-logger level overrides keyed by tracing target.
    pub loggers: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::Text,
            loggers: BTreeMap::new(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Interval between logged metric snapshots in seconds. 0 disables reporting.
    pub frequency_secs: u64,
}

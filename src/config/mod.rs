//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Configuration (validated, immutable)
//!     → passed by reference to bundles and the application
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Unknown top-level tables are kept for application-defined sections

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, ConfigurationFactory, TomlConfigurationFactory};
pub use schema::{
    Configuration, ConnectorConfig, ConnectorType, LogFormat, LoggingConfig, MetricsConfig,
    ServerConfig,
};
pub use validation::ValidationError;

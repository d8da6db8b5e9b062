//! Crate-level error type.
//!
//! Subsystems define their own error enums; this module rolls them up into the
//! single [`Error`] returned from commands and from [`crate::run`].

use crate::admin::AdminError;
use crate::config::ConfigError;
use crate::http::ServerError;

/// Error type returned by user-supplied hooks (bundles, managed objects,
/// health check causes).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A bundle or the application failed during setup. Propagated unmodified.
    #[error(transparent)]
    Setup(BoxError),

    /// Admin registration failed.
    #[error("admin error: {0}")]
    Admin(#[from] AdminError),

    /// The server failed to bind or serve.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// Command arguments could not be parsed.
    #[error("invalid arguments: {0}")]
    Arguments(#[from] clap::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

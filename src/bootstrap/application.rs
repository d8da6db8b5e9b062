//! The application contract.

use async_trait::async_trait;

use crate::bootstrap::Bootstrap;
use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::BoxError;

#[async_trait]
pub trait Application: Send + Sync {
    fn name(&self) -> &str;

    /// Add bundles and commands. Called once, before command dispatch.
    fn initialize(&self, _bootstrap: &mut Bootstrap) {}

    /// Register routes, managed objects, health checks and admin extensions.
    /// Called after every bundle has run.
    async fn run(&self, configuration: &Configuration, environment: &mut Environment) -> Result<(), BoxError>;
}

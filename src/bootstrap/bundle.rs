//! Reusable setup modules.

use async_trait::async_trait;

use crate::bootstrap::Bootstrap;
use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::BoxError;

/// A group of related setup steps shared between applications.
///
/// `initialize` runs as soon as the bundle is added and may register further
/// bundles or commands. `run` is called with the loaded configuration before
/// the application's own `run`.
#[async_trait]
pub trait Bundle: Send + Sync {
    fn initialize(&self, _bootstrap: &mut Bootstrap) {}

    async fn run(&self, configuration: &Configuration, environment: &mut Environment) -> Result<(), BoxError>;
}

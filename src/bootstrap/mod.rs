//! Bootstrap: the application, its bundles and its commands.
//!
//! # Data Flow
//! ```text
//! gantry::run(app, args)
//!     → Bootstrap (default commands)
//!     → app.initialize → add_bundle → bundle.initialize (immediately)
//!     → command selected by args[0]
//!     → command builds Configuration + Environment
//!     → Bootstrap::run: every bundle.run, in order, stop at first error
//!     → app.run
//! ```
//!
//! # Design Decisions
//! - Bundle setup is fail-fast; managed object start/stop is not
//! - Errors from bundles reach the caller unmodified

pub mod application;
pub mod bundle;

use std::sync::Arc;

use crate::command::Command;
use crate::config::{Configuration, ConfigurationFactory, TomlConfigurationFactory};
use crate::environment::Environment;
use crate::error::{Error, Result};

pub use application::Application;
pub use bundle::Bundle;

/// Everything needed to run a command.
pub struct Bootstrap {
    application: Arc<dyn Application>,
    arguments: Vec<String>,
    bundles: Vec<Box<dyn Bundle>>,
    commands: Vec<Arc<dyn Command>>,
    configuration_factory: Box<dyn ConfigurationFactory>,
}

impl Bootstrap {
    pub fn new(application: Arc<dyn Application>, arguments: Vec<String>) -> Self {
        Self {
            application,
            arguments,
            bundles: Vec::new(),
            commands: Vec::new(),
            configuration_factory: Box::new(TomlConfigurationFactory),
        }
    }

    pub fn application(&self) -> &Arc<dyn Application> {
        &self.application
    }

    /// Command-line arguments, command name first.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn bundles(&self) -> &[Box<dyn Bundle>] {
        &self.bundles
    }

    pub fn commands(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    pub fn configuration_factory(&self) -> &dyn ConfigurationFactory {
        self.configuration_factory.as_ref()
    }

    pub fn set_configuration_factory(&mut self, factory: impl ConfigurationFactory + 'static) {
        self.configuration_factory = Box::new(factory);
    }

    /// Initialize the bundle, then append it.
    pub fn add_bundle(&mut self, bundle: impl Bundle + 'static) {
        bundle.initialize(self);
        self.bundles.push(Box::new(bundle));
    }

    pub fn add_command(&mut self, command: impl Command + 'static) {
        self.commands.push(Arc::new(command));
    }

    /// The command whose name equals the first argument.
    pub fn selected_command(&self) -> Option<Arc<dyn Command>> {
        let name = self.arguments.first()?;
        self.commands.iter().find(|c| c.name() == name).cloned()
    }

    /// Run every bundle in registration order, stopping at the first failure.
    pub async fn run(&self, configuration: &Configuration, environment: &mut Environment) -> Result<()> {
        for bundle in &self.bundles {
            bundle.run(configuration, environment).await.map_err(Error::Setup)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::error::BoxError;
    use crate::observability::{LogLevel, LogLevels, MetricsRegistry};

    struct NoopApp;

    #[async_trait]
    impl Application for NoopApp {
        fn name(&self) -> &str {
            "noop"
        }

        async fn run(&self, _configuration: &Configuration, _environment: &mut Environment) -> std::result::Result<(), BoxError> {
            Ok(())
        }
    }

    struct Step {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Bundle for Step {
        fn initialize(&self, _bootstrap: &mut Bootstrap) {
            self.log.lock().push(format!("init {}", self.name));
        }

        async fn run(&self, _configuration: &Configuration, _environment: &mut Environment) -> std::result::Result<(), BoxError> {
            self.log.lock().push(format!("run {}", self.name));
            if self.fail {
                return Err(format!("{} failed", self.name).into());
            }
            Ok(())
        }
    }

    fn environment(configuration: &Configuration) -> Environment {
        Environment::new(
            configuration,
            MetricsRegistry::new(),
            Arc::new(LogLevels::detached(LogLevel::Info)),
        )
    }

    #[tokio::test]
    async fn test_bundles_initialize_on_add_and_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bootstrap = Bootstrap::new(Arc::new(NoopApp), vec![]);
        for name in ["a", "b"] {
            bootstrap.add_bundle(Step { name, fail: false, log: log.clone() });
        }
        assert_eq!(*log.lock(), ["init a", "init b"]);

        let configuration = Configuration::default();
        bootstrap.run(&configuration, &mut environment(&configuration)).await.unwrap();
        assert_eq!(*log.lock(), ["init a", "init b", "run a", "run b"]);
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bootstrap = Bootstrap::new(Arc::new(NoopApp), vec![]);
        for (name, fail) in [("a", false), ("b", true), ("c", false)] {
            bootstrap.add_bundle(Step { name, fail, log: log.clone() });
        }
        log.lock().clear();

        let configuration = Configuration::default();
        let err = bootstrap
            .run(&configuration, &mut environment(&configuration))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "b failed");
        assert_eq!(*log.lock(), ["run a", "run b"]);
    }
}

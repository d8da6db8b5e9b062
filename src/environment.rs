//! Per-run container handed to bundles and the application.

use std::sync::Arc;

use crate::admin::AdminEnvironment;
use crate::config::Configuration;
use crate::health::HealthRegistry;
use crate::http::RouterHandler;
use crate::lifecycle::LifecycleEnvironment;
use crate::observability::{MetricsRegistry, LogLevels};

/// Everything setup code can register into.
///
/// Created once per run and passed by `&mut` to every bundle, then to the
/// application. Registration closes when the server starts.
pub struct Environment {
    /// Application routes, under the application context path.
    pub server: RouterHandler,

    /// Admin handlers, tasks and health checks.
    pub admin: AdminEnvironment,

    /// Objects started before serving and stopped after.
    pub lifecycle: LifecycleEnvironment,

    pub metrics: Arc<MetricsRegistry>,

    pub log_levels: Arc<LogLevels>,
}

impl Environment {
    pub fn new(configuration: &Configuration, metrics: Arc<MetricsRegistry>, log_levels: Arc<LogLevels>) -> Self {
        Self {
            server: RouterHandler::new(&configuration.server.application_context_path),
            admin: AdminEnvironment::new(metrics.clone(), log_levels.clone()),
            lifecycle: LifecycleEnvironment::new(),
            metrics,
            log_levels,
        }
    }

    /// Shorthand for `admin.health_checks()`.
    pub fn health_checks(&self) -> &Arc<HealthRegistry> {
        self.admin.health_checks()
    }
}

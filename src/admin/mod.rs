//! Administrative HTTP surface.
//!
//! # Responsibilities
//! - Hold the admin handlers, the operator tasks and the health registry
//! - Install the built-in views (metrics, ping, runtime, healthcheck) and
//!   tasks (gc, log)
//! - Bind everything onto the admin [`ServerHandler`] at startup
//!
//! # Data Flow
//! ```text
//! Setup:
//!     bundles / application → add_handler, add_task, health_checks().register
//!
//! on_starting:
//!     GET  /                → HTML index of handlers
//!     GET  <handler path>   → handler
//!     POST /tasks/<name>    → task
//! ```
//!
//! # Design Decisions
//! - Handler paths and task names are unique; conflicts are rejected at registration
//! - Registration closes when the starting transition begins
//! - Every admin response is marked uncacheable

pub mod handlers;
pub mod tasks;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request};
use axum::response::Response;

use crate::health::HealthRegistry;
use crate::http::handler::validate_path;
use crate::http::{join_path, Endpoint, RouteError, ServerHandler};
use crate::observability::{LevelControl, MetricsRegistry};

use self::handlers::{HealthCheckHandler, HomeHandler, MetricsHandler, PingHandler, RuntimeHandler};
pub use self::tasks::{GcTask, LogTask, Task, TaskError, TaskParams};

pub const TASKS_PATH: &str = "/tasks";

const CACHE_CONTROL: &str = "must-revalidate,no-cache,no-store";

const NO_HEALTH_CHECKS_WARNING: &str = "
!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!
!    THIS APPLICATION HAS NO HEALTHCHECKS.    !
!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!!
";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    #[error("admin path '{0}' is already registered")]
    DuplicatePath(String),

    #[error("admin path '{0}' is reserved")]
    ReservedPath(String),

    #[error("admin path '{0}' must be an absolute path without parameters")]
    InvalidPath(String),

    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("invalid task name '{0}'")]
    InvalidTaskName(String),

    #[error("admin registry is closed after startup")]
    AlreadyStarted,

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// A read-only operational view.
#[async_trait]
pub trait AdminHandler: Send + Sync + 'static {
    /// Display name on the admin index.
    fn name(&self) -> &str;

    /// Route, relative to the admin context path.
    fn path(&self) -> &str;

    async fn serve(&self, request: Request<Body>) -> Response;
}

pub(crate) fn no_cache(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    response
}

struct AdminEndpoint(Arc<dyn AdminHandler>);

#[async_trait]
impl Endpoint for AdminEndpoint {
    async fn call(&self, request: Request<Body>) -> Response {
        no_cache(self.0.serve(request).await)
    }
}

/// Admin handlers, tasks and health checks of one run.
pub struct AdminEnvironment {
    handlers: Vec<Arc<dyn AdminHandler>>,
    tasks: Vec<Arc<dyn Task>>,
    health_checks: Arc<HealthRegistry>,
    started: bool,
}

impl AdminEnvironment {
    pub fn new(metrics: Arc<MetricsRegistry>, levels: Arc<dyn LevelControl>) -> Self {
        let health_checks = Arc::new(HealthRegistry::new());
        Self {
            handlers: vec![
                Arc::new(MetricsHandler::new(metrics)),
                Arc::new(PingHandler),
                Arc::new(RuntimeHandler),
                Arc::new(HealthCheckHandler::new(health_checks.clone())),
            ],
            tasks: vec![Arc::new(GcTask), Arc::new(LogTask::new(levels))],
            health_checks,
            started: false,
        }
    }

    pub fn health_checks(&self) -> &Arc<HealthRegistry> {
        &self.health_checks
    }

    pub fn handlers(&self) -> &[Arc<dyn AdminHandler>] {
        &self.handlers
    }

    pub fn tasks(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    pub fn add_handler(&mut self, handler: impl AdminHandler) -> Result<(), AdminError> {
        if self.started {
            return Err(AdminError::AlreadyStarted);
        }
        let path = handler.path();
        if path == "/" {
            return Err(AdminError::ReservedPath(path.to_string()));
        }
        if validate_path(path).is_err() {
            return Err(AdminError::InvalidPath(path.to_string()));
        }
        if self.handlers.iter().any(|h| h.path() == path) {
            return Err(AdminError::DuplicatePath(path.to_string()));
        }
        self.handlers.push(Arc::new(handler));
        Ok(())
    }

    pub fn add_task(&mut self, task: impl Task) -> Result<(), AdminError> {
        if self.started {
            return Err(AdminError::AlreadyStarted);
        }
        let name = task.name();
        let route = format!("{}/{}", TASKS_PATH, name);
        if name.is_empty() || name.contains('/') || validate_path(&route).is_err() {
            return Err(AdminError::InvalidTaskName(name.to_string()));
        }
        if self.tasks.iter().any(|t| t.name() == name) {
            return Err(AdminError::DuplicateTask(name.to_string()));
        }
        self.tasks.push(Arc::new(task));
        Ok(())
    }

    /// Bind the index, every handler and every task, then close registration.
    pub fn on_starting(&mut self, server: &mut dyn ServerHandler) -> Result<(), AdminError> {
        self.started = true;
        self.health_checks.freeze();

        let prefix = server.path_prefix().to_string();
        let home = HomeHandler::new(&self.handlers, &prefix);
        server.handle(Method::GET, "/", Arc::new(AdminEndpoint(Arc::new(home))))?;

        for handler in &self.handlers {
            server.handle(Method::GET, handler.path(), Arc::new(AdminEndpoint(handler.clone())))?;
        }
        for task in &self.tasks {
            let path = format!("{}/{}", TASKS_PATH, task.name());
            server.handle(Method::POST, &path, Arc::new(tasks::TaskEndpoint(task.clone())))?;
        }

        self.log_tasks(&prefix);
        self.log_health_checks();
        Ok(())
    }

    pub fn on_stopped(&mut self) {}

    fn log_tasks(&self, prefix: &str) {
        let listing: String = self
            .tasks
            .iter()
            .map(|task| {
                let path = join_path(prefix, &format!("{}/{}", TASKS_PATH, task.name()));
                format!("    {:<7} {}\n", "POST", path)
            })
            .collect();
        tracing::info!("tasks =\n\n{}", listing);
    }

    fn log_health_checks(&self) {
        let names = self.health_checks.names();
        if names.is_empty() {
            tracing::warn!("{}", NO_HEALTH_CHECKS_WARNING);
        }
        tracing::debug!(?names, "health checks");
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use tower::ServiceExt;

    use super::*;
    use crate::http::RouterHandler;
    use crate::observability::{LogLevel, LogLevels};

    fn admin() -> AdminEnvironment {
        AdminEnvironment::new(
            MetricsRegistry::new(),
            Arc::new(LogLevels::detached(LogLevel::Info)),
        )
    }

    struct Static(&'static str);

    #[async_trait]
    impl AdminHandler for Static {
        fn name(&self) -> &str {
            "Static"
        }

        fn path(&self) -> &str {
            self.0
        }

        async fn serve(&self, _request: Request<Body>) -> Response {
            "static".into_response()
        }
    }

    struct Named(&'static str);

    #[async_trait]
    impl Task for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn execute(&self, _params: &TaskParams) -> Result<String, TaskError> {
            panic!("task exploded")
        }
    }

    #[test]
    fn test_defaults() {
        let admin = admin();
        let paths: Vec<&str> = admin.handlers().iter().map(|h| h.path()).collect();
        assert_eq!(paths, ["/metrics", "/ping", "/runtime", "/healthcheck"]);
        let tasks: Vec<&str> = admin.tasks().iter().map(|t| t.name()).collect();
        assert_eq!(tasks, ["gc", "log"]);
    }

    #[test]
    fn test_handler_path_conflicts() {
        let mut admin = admin();
        assert_eq!(
            admin.add_handler(Static("/ping")),
            Err(AdminError::DuplicatePath("/ping".into()))
        );
        assert_eq!(admin.add_handler(Static("/")), Err(AdminError::ReservedPath("/".into())));
        assert_eq!(
            admin.add_handler(Static("status")),
            Err(AdminError::InvalidPath("status".into()))
        );
        assert_eq!(admin.add_handler(Static("/status")), Ok(()));
    }

    #[test]
    fn test_unroutable_handler_paths_rejected_at_registration() {
        let mut admin = admin();
        for path in ["/users/:id", "/a//b", "/{x}", "/files/*rest"] {
            assert_eq!(admin.add_handler(Static(path)), Err(AdminError::InvalidPath(path.into())));
        }
        assert_eq!(
            admin.add_task(Named(":flush")),
            Err(AdminError::InvalidTaskName(":flush".into()))
        );
        assert_eq!(
            admin.add_task(Named("{flush}")),
            Err(AdminError::InvalidTaskName("{flush}".into()))
        );

        let mut server = RouterHandler::new("/");
        assert!(admin.on_starting(&mut server).is_ok());
    }

    #[test]
    fn test_task_name_conflicts() {
        let mut admin = admin();
        assert_eq!(admin.add_task(Named("gc")), Err(AdminError::DuplicateTask("gc".into())));
        assert_eq!(admin.add_task(Named("")), Err(AdminError::InvalidTaskName("".into())));
        assert_eq!(admin.add_task(Named("a/b")), Err(AdminError::InvalidTaskName("a/b".into())));
        assert_eq!(admin.add_task(Named("flush")), Ok(()));
    }

    #[test]
    fn test_registration_closes_on_start() {
        let mut admin = admin();
        let mut server = RouterHandler::new("/admin");
        admin.on_starting(&mut server).unwrap();

        assert_eq!(admin.add_handler(Static("/late")), Err(AdminError::AlreadyStarted));
        assert_eq!(admin.add_task(Named("late")), Err(AdminError::AlreadyStarted));
        assert!(admin
            .health_checks()
            .register("late", || async { crate::health::HealthResult::healthy() })
            .is_err());

        let routes: Vec<(Method, String)> = server.routes();
        assert!(routes.contains(&(Method::GET, "/".to_string())));
        assert!(routes.contains(&(Method::GET, "/healthcheck".to_string())));
        assert!(routes.contains(&(Method::POST, "/tasks/gc".to_string())));
        assert!(routes.contains(&(Method::POST, "/tasks/log".to_string())));
    }

    #[tokio::test]
    async fn test_panicking_task_is_500_with_no_cache() {
        let mut admin = admin();
        admin.add_task(Named("boom")).unwrap();
        let mut server = RouterHandler::new("/");
        admin.on_starting(&mut server).unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/tasks/boom")
            .body(Body::empty())
            .unwrap();
        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["cache-control"], CACHE_CONTROL);
    }
}

//! Operator tasks, served as `POST /tasks/<name>`.
//!
//! # Responsibilities
//! - Define the [`Task`] contract and its query parameters
//! - Built-in `gc` (allocator purge) and `log` (runtime log levels) tasks
//! - Turn task failures and panics into HTTP statuses
//!
//! # Design Decisions
//! - Parameters come from the query string only
//! - A task returns its whole body; nothing is streamed

use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::FutureExt;

use crate::admin::no_cache;
use crate::http::response;
use crate::http::Endpoint;
use crate::observability::runtime;
use crate::observability::{LevelControl, LogLevel};

pub const GC_TASK: &str = "gc";
pub const LOG_TASK: &str = "log";

/// Query parameters of a task request, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskParams {
    pairs: Vec<(String, String)>,
}

impl TaskParams {
    pub fn from_query(query: Option<&str>) -> Self {
        let pairs = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    /// Every value given for `key`.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The first value given for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TaskParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A task failure, rendered as a plain-text response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {message}")]
pub struct TaskError {
    pub status: StatusCode,
    pub message: String,
}

impl TaskError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// An operator action.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// URL segment under `/tasks/`.
    fn name(&self) -> &str;

    async fn execute(&self, params: &TaskParams) -> Result<String, TaskError>;
}

/// Adapts a [`Task`] to a route.
pub(crate) struct TaskEndpoint(pub(crate) Arc<dyn Task>);

#[async_trait]
impl Endpoint for TaskEndpoint {
    async fn call(&self, request: Request<Body>) -> Response {
        let params = TaskParams::from_query(request.uri().query());
        let outcome = AssertUnwindSafe(self.0.execute(&params)).catch_unwind().await;
        let response = match outcome {
            Ok(Ok(body)) => response::text(StatusCode::OK, body),
            Ok(Err(e)) => {
                tracing::debug!(task = %self.0.name(), status = %e.status, "Task rejected");
                response::text(e.status, e.message)
            }
            Err(_) => {
                tracing::error!(task = %self.0.name(), "Task panicked");
                response::text(StatusCode::INTERNAL_SERVER_ERROR, "Task failed\n")
            }
        };
        no_cache(response)
    }
}

/// Return free allocator pages to the operating system.
pub struct GcTask;

#[async_trait]
impl Task for GcTask {
    fn name(&self) -> &str {
        GC_TASK
    }

    async fn execute(&self, _params: &TaskParams) -> Result<String, TaskError> {
        let mut body = String::from("Running GC...\n");
        runtime::purge().map_err(|e| TaskError::internal(format!("{}{}\n", body, e)))?;
        body.push_str("Done!\n");
        Ok(body)
    }
}

/// Query and change logger levels.
///
/// `POST /tasks/log?logger=a&logger=b&level=DEBUG`
pub struct LogTask {
    levels: Arc<dyn LevelControl>,
}

impl LogTask {
    pub fn new(levels: Arc<dyn LevelControl>) -> Self {
        Self { levels }
    }
}

#[async_trait]
impl Task for LogTask {
    fn name(&self) -> &str {
        LOG_TASK
    }

    async fn execute(&self, params: &TaskParams) -> Result<String, TaskError> {
        let loggers = params.get_all("logger");
        if loggers.is_empty() {
            return Ok(String::new());
        }

        if let Some(level) = params.get("level").filter(|level| !level.is_empty()) {
            let level: LogLevel = level
                .parse()
                .map_err(|_| TaskError::bad_request("Level is not supported"))?;
            for logger in &loggers {
                if self.levels.set_level(logger, level) {
                    tracing::info!(logger = %logger, level = %level, "Log level changed");
                }
            }
        }

        let mut body = String::new();
        for logger in loggers {
            if let Some(level) = self.levels.level(logger) {
                let _ = writeln!(body, "{}: {}", logger, level);
            }
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::LogLevels;

    fn log_task() -> (Arc<LogLevels>, LogTask) {
        let levels = Arc::new(LogLevels::detached(LogLevel::Info));
        let task = LogTask::new(levels.clone());
        (levels, task)
    }

    #[test]
    fn test_params_keep_repeated_values() {
        let params = TaskParams::from_query(Some("logger=a&logger=b%3A%3Ac&level=warn"));
        assert_eq!(params.get_all("logger"), ["a", "b::c"]);
        assert_eq!(params.get("level"), Some("warn"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(TaskParams::from_query(None), TaskParams::default());
    }

    #[tokio::test]
    async fn test_log_task_sets_and_reports() {
        let (levels, task) = log_task();
        let params: TaskParams = [("logger", "x"), ("level", "warn")].into_iter().collect();

        assert_eq!(task.execute(&params).await.unwrap(), "x: WARN\n");
        assert_eq!(levels.level("x"), Some(LogLevel::Warn));

        let query: TaskParams = [("logger", "x")].into_iter().collect();
        assert_eq!(task.execute(&query).await.unwrap(), "x: WARN\n");
    }

    #[tokio::test]
    async fn test_log_task_rejects_unknown_level() {
        let (levels, task) = log_task();
        let params: TaskParams = [("logger", "x"), ("level", "bogus")].into_iter().collect();

        let err = task.execute(&params).await.unwrap_err();
        assert_eq!(err, TaskError::bad_request("Level is not supported"));
        assert_eq!(levels.level("x"), Some(LogLevel::Info));
    }

    #[tokio::test]
    async fn test_log_task_without_logger_is_empty() {
        let (_, task) = log_task();
        let params: TaskParams = [("level", "bogus")].into_iter().collect();
        assert_eq!(task.execute(&params).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_log_task_skips_unsupported_loggers() {
        let (_, task) = log_task();
        let params: TaskParams = [("logger", "a=b"), ("logger", "ROOT"), ("level", "debug")]
            .into_iter()
            .collect();
        assert_eq!(task.execute(&params).await.unwrap(), "ROOT: DEBUG\n");
    }

    #[cfg(not(target_env = "msvc"))]
    #[tokio::test]
    async fn test_gc_task_body() {
        let body = GcTask.execute(&TaskParams::default()).await.unwrap();
        assert_eq!(body, "Running GC...\nDone!\n");
    }
}

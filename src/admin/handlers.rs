//! Built-in admin views.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;

use crate::admin::AdminHandler;
use crate::health::{is_all_healthy, HealthRegistry};
use crate::http::{join_path, response};
use crate::observability::{MetricsRegistry, RuntimeStats};

pub const METRICS_PATH: &str = "/metrics";
pub const PING_PATH: &str = "/ping";
pub const RUNTIME_PATH: &str = "/runtime";
pub const HEALTHCHECK_PATH: &str = "/healthcheck";

const HOME_HTML_HEAD: &str = "<!DOCTYPE html>
<html>
<head>
\t<title>Operational Menu</title>
</head>
<body>
\t<h1>Operational Menu</h1>
\t<ul>";

const HOME_HTML_TAIL: &str = "</ul>
</body>
</html>
";

/// Index of every registered handler, served at the admin root.
pub struct HomeHandler {
    page: String,
}

impl HomeHandler {
    pub fn new(handlers: &[Arc<dyn AdminHandler>], context_path: &str) -> Self {
        let mut page = String::from(HOME_HTML_HEAD);
        for handler in handlers {
            let _ = write!(
                page,
                "<li><a href=\"{}\">{}</a></li>",
                join_path(context_path, handler.path()),
                handler.name()
            );
        }
        page.push_str(HOME_HTML_TAIL);
        Self { page }
    }
}

#[async_trait]
impl AdminHandler for HomeHandler {
    fn name(&self) -> &str {
        "Home"
    }

    fn path(&self) -> &str {
        "/"
    }

    async fn serve(&self, _request: Request<Body>) -> Response {
        response::html(StatusCode::OK, self.page.clone())
    }
}

/// Every metrics variable as one flat JSON object.
pub struct MetricsHandler {
    registry: Arc<MetricsRegistry>,
}

impl MetricsHandler {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl AdminHandler for MetricsHandler {
    fn name(&self) -> &str {
        "Metrics"
    }

    fn path(&self) -> &str {
        METRICS_PATH
    }

    async fn serve(&self, _request: Request<Body>) -> Response {
        response::json(StatusCode::OK, self.registry.to_json())
    }
}

pub struct PingHandler;

#[async_trait]
impl AdminHandler for PingHandler {
    fn name(&self) -> &str {
        "Ping"
    }

    fn path(&self) -> &str {
        PING_PATH
    }

    async fn serve(&self, _request: Request<Body>) -> Response {
        response::text(StatusCode::OK, "pong\n")
    }
}

/// Scheduler and allocator statistics.
pub struct RuntimeHandler;

#[async_trait]
impl AdminHandler for RuntimeHandler {
    fn name(&self) -> &str {
        "Runtime"
    }

    fn path(&self) -> &str {
        RUNTIME_PATH
    }

    async fn serve(&self, _request: Request<Body>) -> Response {
        response::text(StatusCode::OK, RuntimeStats::collect().to_string())
    }
}

/// Runs every health check on each request.
///
/// 501 when nothing is registered, 500 when any check is unhealthy.
pub struct HealthCheckHandler {
    registry: Arc<HealthRegistry>,
}

impl HealthCheckHandler {
    pub fn new(registry: Arc<HealthRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl AdminHandler for HealthCheckHandler {
    fn name(&self) -> &str {
        "Healthcheck"
    }

    fn path(&self) -> &str {
        HEALTHCHECK_PATH
    }

    async fn serve(&self, _request: Request<Body>) -> Response {
        let results = self.registry.run_health_checks().await;
        if results.is_empty() {
            return response::text(StatusCode::NOT_IMPLEMENTED, "No health checks registered.");
        }

        let status = if is_all_healthy(&results) {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let mut body = String::new();
        for (name, result) in &results {
            let _ = write!(body, "{}:\n\tHealthy: {}\n", name, result.healthy);
            if let Some(message) = result.message.as_deref().filter(|m| !m.is_empty()) {
                let _ = writeln!(body, "\tMessage: {}", message);
            }
            if let Some(cause) = &result.cause {
                let _ = writeln!(body, "\tCause: {}", cause);
            }
        }
        response::text(status, body)
    }
}

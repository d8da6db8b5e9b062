//! Demo service.
//!
//! ```text
//! gantry server [config.toml]   serve the demo on the configured connectors
//! gantry check [config.toml]    validate a configuration file
//! ```
//!
//! Application routes: `GET /hello?name=..` and the `/greeting` resource.
//! Admin: the built-in views plus a `uptime` health check and a `hits` task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use gantry::http::{response, ServerHandler};
use gantry::{
    Application, BoxError, Bundle, Configuration, Environment, HealthResult, Managed, Resource, RestError, Task,
    TaskError, TaskParams,
};

gantry::use_jemalloc!();

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct GreetingConfig {
    template: String,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            template: "Hello, {}!".to_string(),
        }
    }
}

/// Counts greetings served; exposed to operators as the `hits` task.
#[derive(Default)]
struct Hits(AtomicU64);

struct HitsTask(Arc<Hits>);

#[async_trait]
impl Task for HitsTask {
    fn name(&self) -> &str {
        "hits"
    }

    async fn execute(&self, params: &TaskParams) -> Result<String, TaskError> {
        if params.get("reset").is_some() {
            self.0 .0.store(0, Ordering::Relaxed);
        }
        Ok(format!("hits: {}\n", self.0 .0.load(Ordering::Relaxed)))
    }
}

struct Uptime {
    started: parking_lot::Mutex<Option<Instant>>,
}

#[async_trait]
impl Managed for Uptime {
    fn name(&self) -> &str {
        "uptime"
    }

    async fn start(&self) -> Result<(), BoxError> {
        *self.started.lock() = Some(Instant::now());
        Ok(())
    }

    async fn stop(&self) -> Result<(), BoxError> {
        if let Some(started) = self.started.lock().take() {
            tracing::info!(uptime_secs = started.elapsed().as_secs(), "Uptime tracker stopped");
        }
        Ok(())
    }
}

/// Adds the uptime tracker and its health check.
struct UptimeBundle;

#[async_trait]
impl Bundle for UptimeBundle {
    async fn run(&self, _configuration: &Configuration, environment: &mut Environment) -> Result<(), BoxError> {
        let uptime = Arc::new(Uptime {
            started: parking_lot::Mutex::new(None),
        });
        environment.lifecycle.manage(uptime.clone())?;
        environment.health_checks().register("uptime", move || {
            let uptime = uptime.clone();
            async move {
                match *uptime.started.lock() {
                    Some(started) => HealthResult::healthy_with_message(format!("up {}s", started.elapsed().as_secs())),
                    None => HealthResult::unhealthy("not started"),
                }
            }
        })?;
        Ok(())
    }
}

struct Greeting {
    template: String,
    hits: Arc<Hits>,
}

impl Greeting {
    fn greet(&self, name: &str) -> String {
        self.hits.0.fetch_add(1, Ordering::Relaxed);
        self.template.replacen("{}", name, 1)
    }
}

#[async_trait]
impl Resource for Greeting {
    fn path(&self) -> &str {
        "/greeting"
    }

    async fn get(&self, _request: Request<Body>) -> Result<Value, RestError> {
        Ok(json!({ "message": self.greet("world") }))
    }
}

struct Demo;

#[async_trait]
impl Application for Demo {
    fn name(&self) -> &str {
        "gantry-demo"
    }

    fn initialize(&self, bootstrap: &mut gantry::Bootstrap) {
        bootstrap.add_bundle(UptimeBundle);
    }

    async fn run(&self, configuration: &Configuration, environment: &mut Environment) -> Result<(), BoxError> {
        let greeting: GreetingConfig = configuration.section("greeting")?.unwrap_or_default();
        let hits = Arc::new(Hits::default());

        let endpoint = Arc::new(Greeting {
            template: greeting.template.clone(),
            hits: hits.clone(),
        });
        environment.server.handle(
            Method::GET,
            "/hello",
            Arc::new(move |request: Request<Body>| {
                let endpoint = endpoint.clone();
                async move {
                    let params = TaskParams::from_query(request.uri().query());
                    let name = params.get("name").unwrap_or("world");
                    response::text(StatusCode::OK, format!("{}\n", endpoint.greet(name)))
                }
            }),
        )?;
        environment.server.register_resource(Greeting {
            template: greeting.template,
            hits: hits.clone(),
        })?;
        environment.admin.add_task(HitsTask(hits))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gantry::run(Demo, std::env::args().skip(1).collect()).await?;
    Ok(())
}

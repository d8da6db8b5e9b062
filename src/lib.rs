//! gantry: an application-composition runtime built on Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!   gantry::run(app, args)
//!          │
//!          ▼
//!   ┌─────────────┐   add_bundle    ┌──────────┐
//!   │  Bootstrap  │◀────────────────│  Bundle  │
//!   │  + commands │                 └──────────┘
//!   └──────┬──────┘
//!          │ args[0]
//!          ▼
//!   ┌─────────────┐  Configuration  ┌──────────────────────────────────────┐
//!   │   command   │────────────────▶│             Environment              │
//!   │ server/check│                 │  server     admin        lifecycle   │
//!   └──────┬──────┘                 │  (routes)   (handlers,   (managed    │
//!          │                        │             tasks,       objects)    │
//!          │                        │             health)                  │
//!          ▼                        └──────────────────────────────────────┘
//!   ┌─────────────┐
//!   │    http     │  application connectors ── request ID, timeout, trace, metrics
//!   │   server    │  admin connectors ──────── /, /metrics, /ping, /runtime,
//!   └─────────────┘                             /healthcheck, /tasks/<name>
//!
//!   Cross-cutting: config (TOML), observability (tracing, metrics, jemalloc)
//! ```
//!
//! # Example
//!
//! ```ignore
//! struct Hello;
//!
//! #[async_trait]
//! impl Application for Hello {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!
//!     async fn run(&self, _config: &Configuration, env: &mut Environment) -> Result<(), BoxError> {
//!         env.health_checks().register("self", || async { HealthResult::healthy() })?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> gantry::Result<()> {
//!     gantry::run(Hello, std::env::args().skip(1).collect()).await
//! }
//! ```

// Composition
pub mod bootstrap;
pub mod command;
pub mod environment;

// Core subsystems
pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;

// Cross-cutting concerns
pub mod error;
pub mod observability;

use std::sync::Arc;

pub use admin::{AdminError, AdminHandler, Task, TaskError, TaskParams};
pub use bootstrap::{Application, Bootstrap, Bundle};
pub use command::{CheckCommand, Command, ServerCommand};
pub use config::Configuration;
pub use environment::Environment;
pub use error::{BoxError, Error, Result};
pub use health::{HealthCheck, HealthResult};
pub use http::{Endpoint, Resource, RestError};
pub use lifecycle::Managed;

/// Run `application` with command-line `arguments` (program name excluded).
///
/// The first argument selects a command; without a match the command
/// catalogue is printed and the call succeeds.
pub async fn run<A: Application + 'static>(application: A, arguments: Vec<String>) -> Result<()> {
    let application: Arc<dyn Application> = Arc::new(application);
    let mut bootstrap = Bootstrap::new(application.clone(), arguments);
    bootstrap.add_command(ServerCommand);
    bootstrap.add_command(CheckCommand);
    application.initialize(&mut bootstrap);

    match bootstrap.selected_command() {
        Some(command) => command.run(&bootstrap).await,
        None => {
            print!("{}", command::help(&bootstrap));
            Ok(())
        }
    }
}

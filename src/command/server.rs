//! `server [config.toml]`: run the application as an HTTP server.
//!
//! # Data Flow
//! ```text
//! arguments → Configuration (factory, validated)
//!     → logging, metrics registry
//!     → Environment → bundles (fail-fast) → application
//!     → bind connectors
//!     → admin + managed objects start → serve → managed objects + admin stop
//! ```
//!
//! # Design Decisions
//! - Nothing is bound until every bundle and the application have run, so a
//!   setup failure never accepts a connection

use std::future::Future;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Value};

use crate::bootstrap::Bootstrap;
use crate::command::Command;
use crate::config::Configuration;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::http::BoundServer;
use crate::lifecycle::shutdown_signal;
use crate::observability::metrics::{self, MetricsRegistry, MetricsReporter};
use crate::observability::{logging, AllocatorStats};

#[derive(Debug, Parser)]
#[command(name = "server", about = "Runs the application as an HTTP server")]
struct ServerArgs {
    /// Configuration file (TOML)
    config: Option<PathBuf>,
}

pub struct ServerCommand;

#[async_trait]
impl Command for ServerCommand {
    fn name(&self) -> &str {
        "server"
    }

    fn description(&self) -> &str {
        "Runs the application as an HTTP server"
    }

    async fn run(&self, bootstrap: &Bootstrap) -> Result<()> {
        let args = ServerArgs::try_parse_from(bootstrap.arguments())?;
        let configuration = bootstrap.configuration_factory().build(args.config.as_deref())?;
        run_server(bootstrap, &configuration, shutdown_signal()).await
    }
}

/// Set up the environment, run bundles and the application, then bind.
///
/// Returns the bound server and the environment it will serve.
pub async fn prepare(bootstrap: &Bootstrap, configuration: &Configuration) -> Result<(BoundServer, Environment)> {
    let log_levels = logging::init(&configuration.logging);
    let application = bootstrap.application();
    tracing::info!(application = %application.name(), version = env!("CARGO_PKG_VERSION"), "Starting");

    let registry = MetricsRegistry::new();
    metrics::install(&registry);
    publish_process_variables(&registry);

    let mut environment = Environment::new(configuration, registry, log_levels);
    MetricsReporter::configure(&configuration.metrics, &mut environment);

    bootstrap.run(configuration, &mut environment).await?;
    application
        .run(configuration, &mut environment)
        .await
        .map_err(Error::Setup)?;

    let server = crate::http::Server::bind(&configuration.server).await?;
    Ok((server, environment))
}

/// Prepare, then serve until `shutdown` resolves.
pub async fn run_server<F>(bootstrap: &Bootstrap, configuration: &Configuration, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let (server, environment) = prepare(bootstrap, configuration).await?;
    server.serve(environment, shutdown).await?;
    Ok(())
}

fn publish_process_variables(registry: &MetricsRegistry) {
    registry.publish("cmdline", || json!(std::env::args().collect::<Vec<_>>()));
    registry.publish("memstats", || match AllocatorStats::read() {
        Ok(stats) => serde_json::to_value(stats).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    });
}

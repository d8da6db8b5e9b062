//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use gantry::command::server::prepare;
use gantry::config::{ConnectorConfig, ServerConfig};
use gantry::http::ServerError;
use gantry::{Application, Bootstrap, BoxError, Configuration, Environment};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Configuration with both connectors on ephemeral loopback ports.
pub fn local_configuration(admin_context_path: &str) -> Configuration {
    Configuration {
        server: ServerConfig {
            application_connectors: vec![ConnectorConfig::http("127.0.0.1:0")],
            admin_connectors: vec![ConnectorConfig::http("127.0.0.1:0")],
            admin_context_path: admin_context_path.to_string(),
            shutdown_grace_secs: 2,
            ..ServerConfig::default()
        },
        ..Configuration::default()
    }
}

/// An application that registers nothing.
pub struct EmptyApp;

#[async_trait]
impl Application for EmptyApp {
    fn name(&self) -> &str {
        "empty"
    }

    async fn run(&self, _configuration: &Configuration, _environment: &mut Environment) -> Result<(), BoxError> {
        Ok(())
    }
}

/// An application whose `run` is a closure over the environment.
pub struct FnApp<F>(pub F);

#[async_trait]
impl<F> Application for FnApp<F>
where
    F: Fn(&mut Environment) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn-app"
    }

    async fn run(&self, _configuration: &Configuration, environment: &mut Environment) -> Result<(), BoxError> {
        (self.0)(environment)
    }
}

pub fn bootstrap(application: impl Application + 'static) -> Bootstrap {
    Bootstrap::new(Arc::new(application), vec!["server".to_string()])
}

/// A server running in the background until [`TestServer::stop`].
pub struct TestServer {
    pub app: SocketAddr,
    pub admin: SocketAddr,
    admin_prefix: String,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start(bootstrap: &Bootstrap, configuration: &Configuration) -> Self {
        let (server, environment) = prepare(bootstrap, configuration).await.unwrap();
        let app = server.application_addrs()[0];
        let admin = server.admin_addrs()[0];

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(environment, async move {
            let _ = stopped.await;
        }));

        let admin_prefix = configuration.server.admin_context_path.trim_end_matches('/').to_string();
        let server = Self {
            app,
            admin,
            admin_prefix,
            stop,
            handle,
        };
        server.wait_ready().await;
        server
    }

    async fn wait_ready(&self) {
        for _ in 0..50 {
            if reqwest::get(self.admin_url("/ping")).await.is_ok() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("admin connector never became ready");
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("http://{}{}{}", self.admin, self.admin_prefix, path)
    }

    pub fn app_url(&self, path: &str) -> String {
        format!("http://{}{}", self.app, path)
    }

    pub async fn stop(self) -> Result<(), ServerError> {
        let _ = self.stop.send(());
        self.handle.await.unwrap()
    }
}

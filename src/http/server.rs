//! HTTP server setup and serving.
//!
//! # Responsibilities
//! - Bind every application and admin connector
//! - Wire up application middleware (request ID, timeout, tracing, request metrics)
//! - Drive the starting transition, serve, then drive the stopping transition
//!
//! # Design Decisions
//! - Binding is separate from serving so callers can read the bound addresses
//!   (port 0) and so a setup failure never leaves a socket open
//! - One task per connector; the first connector failure ends the run
//! - Draining is bounded by the configured grace period

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use metrics::{Counter, Histogram};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin::AdminError;
use crate::config::{ConnectorConfig, ConnectorType, ServerConfig};
use crate::environment::Environment;
use crate::http::handler::RouterHandler;
use crate::http::tls::load_tls_config;
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::observability::MetricsRegistry;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },

    #[error("failed to load TLS material for {address}: {source}")]
    Tls { address: String, source: io::Error },

    #[error("connector failed: {0}")]
    Serve(io::Error),

    #[error(transparent)]
    Admin(#[from] AdminError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Application,
    Admin,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Application => "application",
            Role::Admin => "admin",
        }
    }
}

enum Listener {
    Http(TcpListener),
    Https { listener: std::net::TcpListener, tls: RustlsConfig },
}

struct BoundConnector {
    role: Role,
    listener: Listener,
}

impl BoundConnector {
    async fn bind(role: Role, config: &ConnectorConfig) -> Result<Self, ServerError> {
        let bind_error = |source| ServerError::Bind {
            address: config.bind_address.clone(),
            source,
        };
        let address: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| bind_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let listener = match config.kind {
            ConnectorType::Http => Listener::Http(TcpListener::bind(address).await.map_err(bind_error)?),
            ConnectorType::Https => {
                let (Some(cert), Some(key)) = (&config.cert_path, &config.key_path) else {
                    return Err(ServerError::Tls {
                        address: config.bind_address.clone(),
                        source: io::Error::new(io::ErrorKind::InvalidInput, "cert_path and key_path are required"),
                    });
                };
                let tls = load_tls_config(Path::new(cert), Path::new(key))
                    .await
                    .map_err(|source| ServerError::Tls {
                        address: config.bind_address.clone(),
                        source,
                    })?;
                let listener = std::net::TcpListener::bind(address).map_err(bind_error)?;
                Listener::Https { listener, tls }
            }
        };
        Ok(Self { role, listener })
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            Listener::Http(listener) => listener.local_addr().ok(),
            Listener::Https { listener, .. } => listener.local_addr().ok(),
        }
    }

    async fn serve(self, router: Router, stop: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let role = self.role.as_str();
        match self.listener {
            Listener::Http(listener) => {
                if let Ok(address) = listener.local_addr() {
                    tracing::info!(connector = role, address = %address, "HTTP connector listening");
                }
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown::wait(stop))
                    .await
                    .map_err(ServerError::Serve)
            }
            Listener::Https { listener, tls } => {
                if let Ok(address) = listener.local_addr() {
                    tracing::info!(connector = role, address = %address, "HTTPS connector listening");
                }
                let handle = axum_server::Handle::new();
                let trigger = handle.clone();
                tokio::spawn(async move {
                    shutdown::wait(stop).await;
                    trigger.graceful_shutdown(None);
                });
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(router.into_make_service())
                    .await
                    .map_err(ServerError::Serve)
            }
        }
    }
}

/// Entry point for binding connectors.
pub struct Server;

impl Server {
    /// Bind every configured connector.
    pub async fn bind(config: &ServerConfig) -> Result<BoundServer, ServerError> {
        let mut connectors = Vec::new();
        for connector in &config.application_connectors {
            connectors.push(BoundConnector::bind(Role::Application, connector).await?);
        }
        for connector in &config.admin_connectors {
            connectors.push(BoundConnector::bind(Role::Admin, connector).await?);
        }
        Ok(BoundServer {
            connectors,
            admin_context_path: config.admin_context_path.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        })
    }
}

/// Connectors bound and ready to serve.
pub struct BoundServer {
    connectors: Vec<BoundConnector>,
    admin_context_path: String,
    request_timeout: Duration,
    shutdown_grace: Duration,
}

impl BoundServer {
    pub fn application_addrs(&self) -> Vec<SocketAddr> {
        self.addrs(Role::Application)
    }

    pub fn admin_addrs(&self) -> Vec<SocketAddr> {
        self.addrs(Role::Admin)
    }

    fn addrs(&self, role: Role) -> Vec<SocketAddr> {
        self.connectors
            .iter()
            .filter(|c| c.role == role)
            .filter_map(BoundConnector::local_addr)
            .collect()
    }

    /// Start, serve until `shutdown` resolves or a connector fails, then stop.
    pub async fn serve<F>(self, mut environment: Environment, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut admin_routes = RouterHandler::new(&self.admin_context_path);
        environment.admin.on_starting(&mut admin_routes)?;

        // Routers are assembled before any managed object starts.
        let application = application_router(&environment.server, &environment.metrics, self.request_timeout);
        let admin = admin_routes.router().layer(TraceLayer::new_for_http());

        environment.lifecycle.on_starting().await;

        let coordinator = Shutdown::new();
        let mut connectors = JoinSet::new();
        for connector in self.connectors {
            let router = match connector.role {
                Role::Application => application.clone(),
                Role::Admin => admin.clone(),
            };
            connectors.spawn(connector.serve(router, coordinator.subscribe()));
        }

        tokio::pin!(shutdown);
        let result = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                Ok(())
            }
            Some(joined) = connectors.join_next() => match joined {
                Ok(Ok(())) => {
                    tracing::warn!("Connector stopped unexpectedly");
                    Ok(())
                }
                Ok(Err(e)) => Err(e),
                Err(e) => Err(ServerError::Serve(io::Error::other(e))),
            },
        };

        coordinator.trigger();
        let drain = async { while connectors.join_next().await.is_some() {} };
        if tokio::time::timeout(self.shutdown_grace, drain).await.is_err() {
            tracing::warn!(
                grace_secs = self.shutdown_grace.as_secs(),
                remaining = coordinator.receiver_count(),
                "Connectors did not drain in time"
            );
            connectors.abort_all();
        }

        environment.lifecycle.on_stopped().await;
        environment.admin.on_stopped();
        tracing::info!("Server stopped");
        result
    }
}

#[derive(Clone)]
struct RequestMetrics {
    requests: Counter,
    duration_ms: Histogram,
}

async fn track_requests(State(metrics): State<RequestMetrics>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    metrics.requests.increment(1);
    metrics.duration_ms.record(start.elapsed().as_secs_f64() * 1000.0);
    response
}

/// Application routes with the request middleware stack.
#[allow(deprecated)]
fn application_router(routes: &RouterHandler, registry: &MetricsRegistry, timeout: Duration) -> Router {
    let metrics = RequestMetrics {
        requests: registry.counter("http.requests"),
        duration_ms: registry.histogram("http.request_duration_ms"),
    };
    routes
        .router()
        .layer(middleware::from_fn_with_state(metrics, track_requests))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;

    fn local_config() -> ServerConfig {
        ServerConfig {
            application_connectors: vec![ConnectorConfig::http("127.0.0.1:0")],
            admin_connectors: vec![ConnectorConfig::http("127.0.0.1:0")],
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bind_reports_ephemeral_ports() {
        let server = Server::bind(&local_config()).await.unwrap();
        let application = server.application_addrs();
        let admin = server.admin_addrs();
        assert_eq!(application.len(), 1);
        assert_eq!(admin.len(), 1);
        assert_ne!(application[0].port(), 0);
        assert_ne!(application[0], admin[0]);
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_address() {
        let config = ServerConfig {
            application_connectors: vec![ConnectorConfig::http("not-an-address")],
            ..local_config()
        };
        assert!(matches!(Server::bind(&config).await, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_https_without_material_fails() {
        let config = ServerConfig {
            application_connectors: vec![ConnectorConfig {
                kind: ConnectorType::Https,
                ..ConnectorConfig::http("127.0.0.1:0")
            }],
            ..local_config()
        };
        assert!(matches!(Server::bind(&config).await, Err(ServerError::Tls { .. })));
    }

    #[tokio::test]
    async fn test_https_reports_ephemeral_port() {
        let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
        let config = ServerConfig {
            admin_connectors: vec![ConnectorConfig {
                kind: ConnectorType::Https,
                cert_path: Some(format!("{}/localhost.crt", fixtures)),
                key_path: Some(format!("{}/localhost.key", fixtures)),
                ..ConnectorConfig::http("127.0.0.1:0")
            }],
            ..local_config()
        };
        let server = Server::bind(&config).await.unwrap();
        let admin = server.admin_addrs();
        assert_eq!(admin.len(), 1);
        assert_ne!(admin[0].port(), 0);
        assert!(std::net::TcpStream::connect(admin[0]).is_ok());
    }
}

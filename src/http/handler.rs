//! Route registration abstraction.
//!
//! # Responsibilities
//! - Accept `(method, path, endpoint)` bindings from the admin registry and
//!   from application code
//! - Reject duplicate bindings and malformed paths up front, before axum would panic
//! - Produce an `axum::Router` mounted under the handler's path prefix
//!
//! # Design Decisions
//! - Endpoints are trait objects so registries can hold heterogeneous handlers
//! - Routes are kept in a `BTreeMap` so the built router is deterministic

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;

use crate::http::rest::{Resource, ResourceEndpoint};

/// A request handler bound to one method and path.
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    async fn call(&self, request: Request<Body>) -> Response;
}

#[async_trait]
impl<F, Fut> Endpoint for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn call(&self, request: Request<Body>) -> Response {
        (self)(request).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("route {method} {path} is already bound")]
    Duplicate { method: Method, path: String },

    #[error("invalid route path '{0}'")]
    InvalidPath(String),

    #[error("unsupported method {0}")]
    UnsupportedMethod(Method),
}

/// Where the admin registry and applications bind their routes.
pub trait ServerHandler: Send {
    fn handle(&mut self, method: Method, path: &str, endpoint: Arc<dyn Endpoint>) -> Result<(), RouteError>;

    /// Prefix under which every bound path is served, without a trailing slash
    /// unless it is the root.
    fn path_prefix(&self) -> &str;
}

/// Normalize a context path: leading slash, no trailing slash, root stays `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Join a context path and a route path into a public URL path.
pub fn join_path(prefix: &str, path: &str) -> String {
    if prefix == "/" {
        path.to_string()
    } else {
        format!("{}{}", prefix, path)
    }
}

/// Reject paths axum cannot route literally: relative, empty segments, or
/// capture and wildcard syntax.
pub(crate) fn validate_path(path: &str) -> Result<(), RouteError> {
    let valid = path.starts_with('/')
        && !path.contains("//")
        && path
            .split('/')
            .all(|segment| !segment.starts_with(':') && !segment.starts_with('*') && !segment.contains('{'));
    if valid {
        Ok(())
    } else {
        Err(RouteError::InvalidPath(path.to_string()))
    }
}

/// axum-backed [`ServerHandler`].
pub struct RouterHandler {
    prefix: String,
    routes: BTreeMap<String, MethodRouter>,
    bound: HashSet<(Method, String)>,
}

impl RouterHandler {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            routes: BTreeMap::new(),
            bound: HashSet::new(),
        }
    }

    /// Bind every verb of a REST resource at its path.
    pub fn register_resource<R: Resource>(&mut self, resource: R) -> Result<(), RouteError> {
        let resource = Arc::new(resource);
        let path = resource.path().to_string();
        for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let endpoint = ResourceEndpoint::new(resource.clone(), method.clone());
            self.handle(method, &path, Arc::new(endpoint))?;
        }
        Ok(())
    }

    /// Bound `(method, path)` pairs, relative to the prefix.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut routes: Vec<_> = self.bound.iter().cloned().collect();
        routes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        routes
    }

    /// Build the router, nested under the prefix.
    pub fn router(&self) -> Router {
        let inner = self
            .routes
            .iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(path, method_router.clone())
            });
        if self.prefix == "/" {
            inner
        } else {
            Router::new().nest(&self.prefix, inner)
        }
    }
}

impl ServerHandler for RouterHandler {
    fn handle(&mut self, method: Method, path: &str, endpoint: Arc<dyn Endpoint>) -> Result<(), RouteError> {
        validate_path(path)?;
        let filter =
            MethodFilter::try_from(method.clone()).map_err(|_| RouteError::UnsupportedMethod(method.clone()))?;
        if !self.bound.insert((method.clone(), path.to_string())) {
            return Err(RouteError::Duplicate {
                method,
                path: path.to_string(),
            });
        }

        let handler = move |request: Request<Body>| {
            let endpoint = endpoint.clone();
            async move { endpoint.call(request).await }
        };
        let method_router = self.routes.remove(path).unwrap_or_default().on(filter, handler);
        self.routes.insert(path.to_string(), method_router);

        tracing::debug!(method = %method, path = %join_path(&self.prefix, path), "Route bound");
        Ok(())
    }

    fn path_prefix(&self) -> &str {
        &self.prefix
    }
}

//! RESTful resources.
//!
//! A [`Resource`] names a path and implements any subset of the five verbs;
//! the rest answer `405 Method Not Allowed`. Results are rendered as JSON.
//!
//! ```ignore
//! struct Users;
//!
//! #[async_trait]
//! impl Resource for Users {
//!     fn path(&self) -> &str {
//!         "/users"
//!     }
//!
//!     async fn get(&self, _request: Request<Body>) -> Result<Value, RestError> {
//!         Ok(json!([]))
//!     }
//! }
//!
//! environment.server.register_resource(Users)?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use crate::error::BoxError;
use crate::http::handler::Endpoint;
use crate::http::response;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(BoxError),
}

impl RestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => StatusCode::NOT_FOUND,
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        if let RestError::Internal(e) = &self {
            tracing::error!(error = %e, "Resource failed");
        }
        let body = json!({ "error": self.to_string() });
        response::json(self.status(), body.to_string())
    }
}

/// A path-addressed resource with one method per HTTP verb.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    fn path(&self) -> &str;

    async fn get(&self, _request: Request<Body>) -> Result<Value, RestError> {
        Err(RestError::MethodNotAllowed)
    }

    async fn post(&self, _request: Request<Body>) -> Result<Value, RestError> {
        Err(RestError::MethodNotAllowed)
    }

    async fn put(&self, _request: Request<Body>) -> Result<Value, RestError> {
        Err(RestError::MethodNotAllowed)
    }

    async fn delete(&self, _request: Request<Body>) -> Result<Value, RestError> {
        Err(RestError::MethodNotAllowed)
    }

    async fn head(&self, _request: Request<Body>) -> Result<Value, RestError> {
        Err(RestError::MethodNotAllowed)
    }
}

/// Dispatches one verb of a resource.
pub(crate) struct ResourceEndpoint<R> {
    resource: Arc<R>,
    method: Method,
}

impl<R> ResourceEndpoint<R> {
    pub(crate) fn new(resource: Arc<R>, method: Method) -> Self {
        Self { resource, method }
    }
}

#[async_trait]
impl<R: Resource> Endpoint for ResourceEndpoint<R> {
    async fn call(&self, request: Request<Body>) -> Response {
        let result = match self.method {
            Method::GET => self.resource.get(request).await,
            Method::POST => self.resource.post(request).await,
            Method::PUT => self.resource.put(request).await,
            Method::DELETE => self.resource.delete(request).await,
            Method::HEAD => self.resource.head(request).await,
            _ => Err(RestError::MethodNotAllowed),
        };
        match result {
            Ok(value) => response::json(StatusCode::OK, value.to_string()),
            Err(e) => e.into_response(),
        }
    }
}

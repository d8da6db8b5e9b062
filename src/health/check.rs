//! Health probe contract.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::error::BoxError;

/// Outcome of a single health probe.
pub struct HealthResult {
    pub healthy: bool,
    pub message: Option<String>,
    pub cause: Option<BoxError>,
}

impl HealthResult {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
            cause: None,
        }
    }

    pub fn healthy_with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::healthy()
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: Some(message.into()),
            cause: None,
        }
    }

    pub fn unhealthy_error(cause: impl Into<BoxError>) -> Self {
        Self {
            healthy: false,
            message: None,
            cause: Some(cause.into()),
        }
    }
}

impl fmt::Debug for HealthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthResult")
            .field("healthy", &self.healthy)
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .finish()
    }
}

/// A named probe, registered with [`crate::health::HealthRegistry`].
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    async fn check(&self) -> HealthResult;
}

#[async_trait]
impl<F, Fut> HealthCheck for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HealthResult> + Send + 'static,
{
    async fn check(&self) -> HealthResult {
        (self)().await
    }
}

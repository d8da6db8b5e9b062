//! Managed objects and their ordered start/stop.
//!
//! # Design Decisions
//! - Objects start in registration order and stop in reverse
//! - A failing object is logged and skipped; the rest are still attempted
//! - Registration closes when the starting transition begins

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;

/// A component whose lifetime is bound to the server's.
#[async_trait]
pub trait Managed: Send + Sync {
    /// Name used in log events.
    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), BoxError>;

    async fn stop(&self) -> Result<(), BoxError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("managed object '{0}' registered after startup")]
    AlreadyStarted(String),
}

/// Ordered registry of managed objects.
#[derive(Default)]
pub struct LifecycleEnvironment {
    managed: Vec<Arc<dyn Managed>>,
    started: bool,
}

impl LifecycleEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object. Rejected once `on_starting` has run.
    pub fn manage(&mut self, object: Arc<dyn Managed>) -> Result<(), LifecycleError> {
        if self.started {
            return Err(LifecycleError::AlreadyStarted(object.name().to_string()));
        }
        tracing::debug!(name = %object.name(), "Managed object registered");
        self.managed.push(object);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.managed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
    }

    /// Start every object in registration order.
    pub async fn on_starting(&mut self) {
        self.started = true;
        for object in &self.managed {
            match object.start().await {
                Ok(()) => tracing::debug!(name = %object.name(), "Managed object started"),
                Err(e) => {
                    tracing::warn!(name = %object.name(), error = %e, "Managed object failed to start")
                }
            }
        }
    }

    /// Stop every object in reverse registration order.
    pub async fn on_stopped(&mut self) {
        for object in self.managed.iter().rev() {
            match object.stop().await {
                Ok(()) => tracing::debug!(name = %object.name(), "Managed object stopped"),
                Err(e) => {
                    tracing::warn!(name = %object.name(), error = %e, "Managed object failed to stop")
                }
            }
        }
    }
}

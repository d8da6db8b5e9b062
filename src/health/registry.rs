//! Name-keyed collection of health probes.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::FutureExt;
use parking_lot::RwLock;

use crate::health::check::{HealthCheck, HealthResult};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthError {
    #[error("health check '{0}' is already registered")]
    Duplicate(String),

    #[error("health check '{0}' registered after startup")]
    AlreadyStarted(String),
}

/// Health probes shared between setup code and the `/healthcheck` handler.
#[derive(Default)]
pub struct HealthRegistry {
    checks: RwLock<Vec<(String, Arc<dyn HealthCheck>)>>,
    frozen: AtomicBool,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe under a unique name. Rejected once the server has started.
    pub fn register<C: HealthCheck>(&self, name: impl Into<String>, check: C) -> Result<(), HealthError> {
        let name = name.into();
        if self.frozen.load(Ordering::Acquire) {
            return Err(HealthError::AlreadyStarted(name));
        }
        let mut checks = self.checks.write();
        if checks.iter().any(|(existing, _)| *existing == name) {
            return Err(HealthError::Duplicate(name));
        }
        checks.push((name, Arc::new(check)));
        Ok(())
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.checks.read().iter().map(|(name, _)| name.clone()).collect()
    }

    pub(crate) fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Run every probe and return one snapshot keyed by name.
    pub async fn run_health_checks(&self) -> BTreeMap<String, HealthResult> {
        let checks = self.checks.read().clone();
        let results = join_all(checks.iter().map(|(name, check)| async move {
            let result = AssertUnwindSafe(check.check())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(check = %name, "Health check panicked");
                    HealthResult::unhealthy("health check panicked")
                });
            (name.clone(), result)
        }))
        .await;
        results.into_iter().collect()
    }
}

/// Aggregate health: true iff every result is healthy.
pub fn is_all_healthy(results: &BTreeMap<String, HealthResult>) -> bool {
    results.values().all(|result| result.healthy)
}

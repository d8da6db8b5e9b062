//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before start):
//!     bundle / application
//!     → HealthRegistry::register(name, check)
//!
//! On every /healthcheck request:
//!     → run all checks concurrently
//!     → one name-keyed snapshot
//!     → healthy iff every result is healthy
//! ```
//!
//! # Design Decisions
//! - Checks run on demand, never on a timer
//! - No timeouts or retries: a hanging check stalls its request
//! - A panicking check is reported as unhealthy, not propagated

pub mod check;
pub mod registry;

pub use check::{HealthCheck, HealthResult};
pub use registry::{is_all_healthy, HealthError, HealthRegistry};

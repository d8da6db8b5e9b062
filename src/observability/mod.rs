//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, runtime-adjustable levels)
//!     → metrics.rs (counters, gauges, histograms, published values)
//!
//! Consumers:
//!     → stdout (text or JSON)
//!     → admin /metrics, /runtime and the log task
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Metrics are cheap (atomic increments)
//! - Registries are handed to the admin surface explicitly

pub mod logging;
pub mod metrics;
pub mod runtime;

pub use logging::{LevelControl, LogLevel, LogLevels};
pub use metrics::{MetricsRegistry, MetricsReporter};
pub use runtime::{AllocatorStats, RuntimeStats};

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (managed.rs):
//!     bundles / application → LifecycleEnvironment::manage
//!
//! Startup:
//!     admin registry → managed objects, in registration order → serve
//!
//! Shutdown (signals.rs → shutdown.rs):
//!     SIGTERM/SIGINT → stop accepting → drain connectors
//!     → managed objects, in reverse order → admin registry
//! ```
//!
//! # Design Decisions
//! - Start/stop failures are logged, never fatal to the transition
//! - Shutdown has a grace period: connectors are abandoned after the deadline

pub mod managed;
pub mod shutdown;
pub mod signals;

pub use managed::{LifecycleEnvironment, LifecycleError, Managed};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;

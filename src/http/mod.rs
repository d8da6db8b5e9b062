//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! Setup:
//!     bundles / application → RouterHandler (application routes, REST resources)
//!     admin registry        → RouterHandler (admin routes)
//!
//! Serving:
//!     TCP/TLS connection
//!     → server.rs (connector per bind address)
//!     → middleware (request ID, timeout, trace, request metrics)
//!     → handler.rs (endpoint bound to method + path)
//! ```

pub mod handler;
pub mod response;
pub mod rest;
pub mod server;
pub mod tls;

pub use handler::{join_path, normalize_prefix, Endpoint, RouteError, RouterHandler, ServerHandler};
pub use rest::{Resource, RestError};
pub use server::{BoundServer, Server, ServerError};

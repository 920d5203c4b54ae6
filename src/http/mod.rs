//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → routing::RouterService (match, middleware, handler)
//!     → Send to client
//! ```

pub mod server;

pub use server::{build_router, HttpServer, ServerError, SERVER_NAME};

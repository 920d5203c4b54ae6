//! Trellis Router
//!
//! A trie-based HTTP request router: URL templates with named parameters,
//! prefix routes, per-method handlers and layered middleware, served with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request ID, timeout, trace)
//!                         │
//!                         ▼
//!                     routing::RouterService
//!                         │  Router::route(method, path)
//!                         │  → trie search, scoring
//!                         ▼
//!                     middleware → handler
//!     Client Response ◀───┘
//!
//!     Cross-cutting: config, observability (logs, metrics), lifecycle
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::RouterConfig;
pub use http::HttpServer;
pub use routing::{Handler, Middleware, RouteMatch, RouteOutcome, Router, RouterService};

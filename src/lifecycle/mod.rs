//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Metrics exporter → Route table → Listener
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: metrics first, then routes, then listener
//! - Shutdown stops accepting and drains in-flight requests

pub mod signals;
pub mod startup;

pub use signals::shutdown_signal;
pub use startup::{start, StartupError};

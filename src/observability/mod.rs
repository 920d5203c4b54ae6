//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Routing and server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (outcome counters, match latency)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Template registration (at startup):
//!     "/posts/{id}"
//!     → key.rs (parse into keys)
//!     → trie.rs (insert, share common segments, bind handlers on terminator)
//!
//! Incoming Request (method, path)
//!     → router.rs (strip mount prefix, split into segments)
//!     → matcher.rs (find every candidate, score, pick the best)
//!     → trie.rs (pattern, parameters, handler + middleware)
//!     → Return: Matched / MethodNotAllowed / NotFound
//!     → service.rs (wrap middleware, invoke handler)
//! ```
//!
//! # Design Decisions
//! - Templates registered at startup; routing only reads the trie
//! - No regex: segments are literal, `{parameter}`, or a trailing prefix
//! - Most specific template wins; earlier segments decide first
//! - "Not found" and "method not allowed" are distinct outcomes

pub mod handler;
pub mod key;
pub mod matcher;
pub mod node;
pub mod params;
pub mod router;
pub mod service;
pub mod trie;

/// Method-table entry used by handlers bound without explicit methods.
pub const CATCH_ALL_METHOD: &str = "*";

pub use handler::{Handler, Middleware};
pub use key::{Key, TemplateError};
pub use params::Params;
pub use router::{Endpoint, Methods, Route, RouteOutcome, Router};
pub use service::{RouteMatch, RouterService};
pub use trie::Trie;

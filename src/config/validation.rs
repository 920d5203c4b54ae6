//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, templates, methods and status codes
//! - Detect duplicate route names
//! - Detect ambiguous routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Two routes are ambiguous when they have the same kind, the same shape
//!   once parameter names are ignored, and share a method; the router would
//!   always pick the first one

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::config::schema::{RouteConfig, RouteKind, RouterConfig};
use crate::routing::key::{parse_template, TemplateError};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("route {route:?}: {source}")]
    InvalidTemplate {
        route: String,
        #[source]
        source: TemplateError,
    },

    #[error("route {route:?}: invalid method {method:?}")]
    InvalidMethod { route: String, method: String },

    #[error("route {route:?}: invalid status code {status}")]
    InvalidStatus { route: String, status: u16 },

    #[error("duplicate route name {0:?}")]
    DuplicateName(String),

    #[error("routes {first:?} and {second:?} are ambiguous")]
    AmbiguousRoutes { first: String, second: String },

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "metrics",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut names = HashSet::new();
    let mut shapes: Vec<(&RouteConfig, String)> = Vec::new();
    for route in &config.routes {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateName(route.name.clone()));
        }
        for method in &route.methods {
            if Method::from_bytes(method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    route: route.name.clone(),
                    method: method.clone(),
                });
            }
        }
        if StatusCode::from_u16(route.status).is_err() {
            errors.push(ValidationError::InvalidStatus {
                route: route.name.clone(),
                status: route.status,
            });
        }

        let shape = match shape_of(route) {
            Ok(shape) => shape,
            Err(source) => {
                errors.push(ValidationError::InvalidTemplate {
                    route: route.name.clone(),
                    source,
                });
                continue;
            }
        };
        if let Some((first, _)) = shapes
            .iter()
            .find(|(other, other_shape)| {
                *other_shape == shape && other.kind == route.kind && methods_overlap(other, route)
            })
        {
            errors.push(ValidationError::AmbiguousRoutes {
                first: first.name.clone(),
                second: route.name.clone(),
            });
        }
        shapes.push((route, shape));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Template with parameter names erased, e.g. `/posts/{}`.
fn shape_of(route: &RouteConfig) -> Result<String, TemplateError> {
    let keys = parse_template(&route.template, route.kind == RouteKind::Prefix)?;
    let segments: Vec<&str> = keys
        .iter()
        .map(|key| if key.dynamic { "{}" } else { key.value.as_str() })
        .collect();
    Ok(format!("/{}", segments.join("/")))
}

fn methods_overlap(a: &RouteConfig, b: &RouteConfig) -> bool {
    if a.methods.is_empty() || b.methods.is_empty() {
        return true;
    }
    a.methods.iter().any(|method| b.methods.contains(method))
}

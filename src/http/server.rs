//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the route table from the configured routes
//! - Create the Axum app with the router as its fallback service
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and shut down gracefully

use std::future::Future;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{RouteConfig, RouteKind, RouterConfig};
use crate::routing::{Handler, Middleware, Params, RouteMatch, Router, TemplateError};

/// Value of the `server` header added to every response.
pub const SERVER_NAME: &str = "trellis-router";

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid route: {0}")]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Body returned by configured routes.
#[derive(Debug, Serialize)]
struct RouteResponse {
    route: String,
    pattern: String,
    params: Params,
    methods: Vec<String>,
    body: String,
}

/// HTTP server answering configured routes.
pub struct HttpServer {
    app: axum::Router,
    config: RouterConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RouterConfig) -> Result<Self, ServerError> {
        let router = build_router(&config)?;
        let app = Self::build_app(&config, router);
        Ok(Self { app, config })
    }

    /// Build the Axum app with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &RouterConfig, router: Router) -> axum::Router {
        axum::Router::new()
            .fallback_service(router.into_service())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The Axum app, for serving on a custom transport or driving in tests.
    pub fn app(&self) -> axum::Router {
        self.app.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` completes.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the route table for `config`.
///
/// Routes without methods answer every method. Every response carries the
/// `server` header.
pub fn build_router(config: &RouterConfig) -> Result<Router, TemplateError> {
    let mut router = Router::new();
    router.set_prefix(config.prefix.clone());
    router.middleware(Middleware::from_layer(SetResponseHeaderLayer::if_not_present(
        header::SERVER,
        HeaderValue::from_static(SERVER_NAME),
    )));

    for route in &config.routes {
        let endpoint = match route.kind {
            RouteKind::Endpoint => router.endpoint(&route.template)?,
            RouteKind::Prefix => router.prefix(&route.template)?,
        };
        let handler = configured_response(route);
        if route.methods.is_empty() {
            endpoint.handler(handler);
        } else {
            endpoint.methods(route.methods.iter().cloned()).handler(handler);
        }
        tracing::debug!(
            route = %route.name,
            pattern = %endpoint.pattern(),
            methods = ?route.methods,
            "Route configured"
        );
    }
    Ok(router)
}

fn configured_response(route: &RouteConfig) -> Handler {
    let name = route.name.clone();
    let body = route.body.clone();
    let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::OK);
    Handler::new(move |matched: RouteMatch| {
        let response = RouteResponse {
            route: name.clone(),
            pattern: matched.pattern,
            params: matched.params,
            methods: matched.methods,
            body: body.clone(),
        };
        async move { (status, Json(response)) }
    })
}

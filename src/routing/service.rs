//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → percent-decode path
//!     → Router::route (method, path)
//!     → RouteMatch inserted into request extensions
//!     → handler wrapped: method middleware → endpoint middleware → router middleware
//!     → Response
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::future::BoxFuture;
use serde::Serialize;
use tower::{Service, ServiceExt};

use crate::observability::metrics;
use crate::routing::handler::{apply, Handler};
use crate::routing::key::decode_path;
use crate::routing::params::Params;
use crate::routing::router::{RouteOutcome, Router};

/// What the router matched, attached to the request before the handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    /// Canonical form of the matched template, mount prefix included.
    pub pattern: String,
    pub params: Params,
    /// Methods bound explicitly on the template, sorted.
    pub methods: Vec<String>,
}

impl<S> FromRequestParts<S> for RouteMatch
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RouteMatch>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Request was not routed"))
    }
}

/// Cloneable tower service dispatching requests through a [`Router`].
///
/// Can be served directly or installed as an axum fallback service.
#[derive(Debug, Clone)]
pub struct RouterService {
    router: Arc<Router>,
}

impl RouterService {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolve the handler for `request`, attaching match metadata to it.
    fn resolve(&self, request: &mut Request<Body>) -> Handler {
        let started = Instant::now();
        let method = request.method().as_str().to_string();
        let path = decode_path(request.uri().path()).into_owned();
        let outcome = self.router.route(&method, &path);
        metrics::record_match(outcome.label(), started);

        let handler = match outcome {
            RouteOutcome::NotFound => {
                tracing::debug!(method = %method, path = %path, "No route matched");
                self.router.not_found_handler()
            }
            RouteOutcome::MethodNotAllowed {
                pattern,
                params,
                methods,
            } => {
                tracing::debug!(
                    method = %method,
                    path = %path,
                    pattern = %pattern,
                    allowed = ?methods,
                    "Method not allowed"
                );
                request.extensions_mut().insert(RouteMatch {
                    pattern,
                    params,
                    methods,
                });
                self.router.method_not_allowed_handler()
            }
            RouteOutcome::Matched(route) => {
                tracing::debug!(
                    method = %method,
                    path = %path,
                    pattern = %route.pattern,
                    "Route matched"
                );
                request.extensions_mut().insert(RouteMatch {
                    pattern: route.pattern,
                    params: route.params,
                    methods: route.methods,
                });
                let handler = apply(route.handler, &route.method_middleware);
                apply(handler, &route.endpoint_middleware)
            }
        };
        apply(handler, self.router.router_middleware())
    }
}

impl Service<Request<Body>> for RouterService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let handler = self.resolve(&mut request);
        Box::pin(handler.oneshot(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_match_extractor() {
        let router = Router::new();
        router
            .endpoint("/posts/{id}")
            .unwrap()
            .handler(Handler::new(|matched: RouteMatch| async move {
                matched.params.get("id").unwrap_or_default().to_string()
            }));
        let response = router
            .into_service()
            .oneshot(Request::get("/posts/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"42");
    }

    #[tokio::test]
    async fn test_extractor_rejects_unrouted_request() {
        let (mut parts, _) = Request::new(()).into_parts();
        let rejected = RouteMatch::from_request_parts(&mut parts, &()).await;
        assert_eq!(rejected.unwrap_err().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! Handlers and middleware bound to templates.
//!
//! # Design Decisions
//! - A handler is any cloneable tower service over `Request<Body>` that never
//!   fails; axum handler functions convert directly
//! - Middleware is a function from handler to handler, so tower layers and
//!   plain closures are interchangeable
//! - Default 404/405 responses are ordinary handlers and can be replaced

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};

use crate::routing::service::RouteMatch;

/// A request handler.
#[derive(Clone)]
pub struct Handler(BoxCloneSyncService<Request<Body>, Response, Infallible>);

impl Handler {
    /// Wrap an axum handler function.
    pub fn new<H, T>(handler: H) -> Self
    where
        H: axum::handler::Handler<T, ()>,
        T: 'static,
    {
        Self::from_service(handler.with_state(()))
    }

    /// Wrap any infallible tower service.
    pub fn from_service<S>(service: S) -> Self
    where
        S: Service<Request<Body>, Error = Infallible> + Clone + Send + Sync + 'static,
        S::Response: IntoResponse + 'static,
        S::Future: Send + 'static,
    {
        Self(BoxCloneSyncService::new(
            service.map_response(IntoResponse::into_response),
        ))
    }
}

impl Service<Request<Body>> for Handler {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.0.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        self.0.call(request)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// Transforms a handler into a wrapped handler.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Handler) -> Handler + Send + Sync>);

impl Middleware {
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    /// Use a tower layer as middleware.
    pub fn from_layer<L>(layer: L) -> Self
    where
        L: Layer<Handler> + Send + Sync + 'static,
        L::Service: Service<Request<Body>, Error = Infallible> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request<Body>>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request<Body>>>::Future: Send + 'static,
    {
        Self::new(move |handler| Handler::from_service(layer.layer(handler)))
    }

    pub fn wrap(&self, handler: Handler) -> Handler {
        (self.0)(handler)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Wrap `handler` with each middleware in turn; the first one ends up
/// closest to the handler.
pub fn apply<'a>(handler: Handler, middleware: impl IntoIterator<Item = &'a Middleware>) -> Handler {
    middleware
        .into_iter()
        .fold(handler, |handler, middleware| middleware.wrap(handler))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Page Not Found").into_response()
}

async fn method_not_allowed(request: Request<Body>) -> Response {
    let allow = request
        .extensions()
        .get::<RouteMatch>()
        .map(|matched| matched.methods.join(", "))
        .unwrap_or_default();
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allow)],
        "405 Method Not Allowed",
    )
        .into_response()
}

/// Handler used when no template matches.
pub fn default_not_found() -> Handler {
    Handler::new(not_found)
}

/// Handler used when a template matches but not the request method.
pub fn default_method_not_allowed() -> Handler {
    Handler::new(method_not_allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tower_http::set_header::SetResponseHeaderLayer;

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn tag(label: &'static str) -> Middleware {
        Middleware::new(move |inner: Handler| {
            Handler::from_service(tower::service_fn(move |request: Request<Body>| {
                let inner = inner.clone();
                async move {
                    let response = inner.oneshot(request).await?;
                    let body = body_of(response).await;
                    Ok::<_, Infallible>(format!("{}({})", label, body))
                }
            }))
        })
    }

    #[tokio::test]
    async fn test_apply_wraps_first_innermost() {
        let handler = Handler::new(|| async { "h" });
        let wrapped = apply(handler, &[tag("a"), tag("b")]);
        let response = wrapped
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();
        assert_eq!(body_of(response).await, "b(a(h))");
    }

    #[tokio::test]
    async fn test_layer_middleware() {
        let layer = SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static("test"),
        );
        let handler = Middleware::from_layer(layer).wrap(Handler::new(|| async { "ok" }));
        let response = handler.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(response.headers()[header::SERVER], "test");
    }

    #[tokio::test]
    async fn test_default_not_found() {
        let response = default_not_found()
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "404 Page Not Found");
    }
}

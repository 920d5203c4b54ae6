//! Shared utilities for integration testing.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use trellis_router::config::RouterConfig;
use trellis_router::http::{HttpServer, ServerError};
use trellis_router::routing::{Handler, Middleware, RouterService};

/// Handler answering with a fixed body.
#[allow(dead_code)]
pub fn label(name: &'static str) -> Handler {
    Handler::new(move || async move { name })
}

/// Middleware wrapping the inner response body as `tag(body)`.
#[allow(dead_code)]
pub fn tag(name: &'static str) -> Middleware {
    Middleware::new(move |inner: Handler| {
        Handler::from_service(tower::service_fn(move |request: Request<Body>| {
            let inner = inner.clone();
            async move {
                let response = inner.oneshot(request).await?;
                let status = response.status();
                let body = read_body(response.into_body()).await;
                Ok::<_, Infallible>((status, format!("{}({})", name, body)))
            }
        }))
    })
}

#[allow(dead_code)]
pub async fn read_body(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Dispatch one request through `service`.
#[allow(dead_code)]
pub async fn send(service: &RouterService, method: &str, path: &str) -> (StatusCode, HeaderMap, String) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    let response = service.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    (status, headers, read_body(response.into_body()).await)
}

/// A server running on an ephemeral local port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn start(config: RouterConfig) -> Self {
        let server = HttpServer::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, stop) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(listener, async move {
            let _ = stop.await;
        }));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn stop(self) -> Result<(), ServerError> {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap()
    }
}

//! HTTP/1.1 server
//!
//! Serves an [`AssembledService`] on a listener the host has already bound.
//! On shutdown the accept loop stops and open connections are drained
//! gracefully before `serve` returns.

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::composer::AssembledService;
use super::response::detail;
use super::route::HttpResponse;

/// Accept loop over a bound listener
pub struct HttpServer {
    listener: TcpListener,
    service: Arc<AssembledService>,
}

impl HttpServer {
    pub fn new(listener: TcpListener, service: Arc<AssembledService>) -> Self {
        Self { listener, service }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` is cancelled, then drain open connections
    pub async fn serve(self, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();
        if let Ok(addr) = self.listener.local_addr() {
            info!("HTTP server listening on {}", addr);
        }

        loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        if pause_after_accept_error(&shutdown).await {
                            continue;
                        }
                        break;
                    }
                },
            };

            debug!("Accepted connection from {}", peer);
            let service = Arc::clone(&self.service);
            let shutdown = shutdown.clone();

            tracker.spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| {
                    let service = Arc::clone(&service);
                    async move { Ok::<_, Infallible>(handle(service, req).await) }
                });

                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), svc);
                tokio::pin!(conn);

                tokio::select! {
                    result = conn.as_mut() => {
                        if let Err(e) = result {
                            debug!("Connection from {} closed with error: {}", peer, e);
                        }
                    }
                    _ = shutdown.cancelled() => {
                        conn.as_mut().graceful_shutdown();
                        if let Err(e) = conn.await {
                            debug!("Connection from {} failed while draining: {}", peer, e);
                        }
                    }
                }
            });
        }

        tracker.close();
        debug!("Draining {} open connections", tracker.len());
        tracker.wait().await;
        info!("HTTP server stopped");
    }
}

/// Pause between accept retries so a persistent error (EMFILE) does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Wait out the accept backoff; false if shutdown arrived first
async fn pause_after_accept_error(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => true,
    }
}

async fn handle(service: Arc<AssembledService>, req: Request<Incoming>) -> HttpResponse {
    let (parts, body) = req.into_parts();
    let body: Bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            return detail(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };
    service.dispatch(Request::from_parts(parts, body)).await
}

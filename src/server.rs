//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.
//!
//! A request that is still in flight when the drain finishes is logged like
//! any other; one that never completes is never logged.

use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::client_ip::TrustedProxies;
use crate::error::Error;
use crate::middleware::Next;
use crate::request::Request;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: String,
    trusted_proxies: TrustedProxies,
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`) when
    /// [`serve`](Server::serve) is called. An invalid address is reported by
    /// `serve`.
    ///
    /// ```rust,no_run
    /// use tsu_reqlog::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), trusted_proxies: TrustedProxies::new() }
    }

    /// Believe `X-Forwarded-For` / `X-Real-IP` on connections from `proxy`.
    /// Call once per proxy address (nginx, ingress pods, load balancer).
    pub fn trust_proxy(mut self, proxy: IpAddr) -> Self {
        self.trusted_proxies.insert(proxy);
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|source| Error::InvalidAddress {
            addr: self.addr.clone(),
            source,
        })?;
        let listener = TcpListener::bind(addr).await?;

        if self.trusted_proxies.is_empty() {
            info!(%addr, "tsu listening");
        } else {
            info!(%addr, trusted_proxies = ?self.trusted_proxies, "tsu listening");
        }

        run(listener, router, self.trusted_proxies, shutdown_signal()).await;

        info!("tsu stopped");
        Ok(())
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Serves connections from `listener` until `shutdown` resolves, then waits
/// for every in-flight connection to finish.
async fn run(
    listener: TcpListener,
    router: Router,
    trusted: TrustedProxies,
    shutdown: impl Future<Output = ()>,
) {
    let router = Arc::new(router);
    let trusted = Arc::new(trusted);
    let mut tasks = tokio::task::JoinSet::new();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Check shutdown first so a SIGTERM stops accepting new
            // connections even if more are queued.
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                let trusted = Arc::clone(&trusted);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        let trusted = Arc::clone(&trusted);
                        async move { dispatch(router, trusted, req, remote_addr).await }
                    });

                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Collects the body and runs the request through the middleware chain.
///
/// Infallible: every failure becomes a status code so hyper never sees one.
/// A body that cannot be read still goes through the chain (and so gets
/// logged); the router answers it with `400`.
async fn dispatch(
    router: Arc<Router>,
    trusted: Arc<TrustedProxies>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let req = match body.collect().await {
        Ok(collected) => Request::new(parts, collected.to_bytes(), remote_addr, trusted),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            let mut req = Request::new(parts, Bytes::new(), remote_addr, trusted);
            req.reject_body(format!("failed to read request body: {e}"));
            req
        }
    };

    Ok(Next::new(router).run(req).await.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A signal whose handler cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

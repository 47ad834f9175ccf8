//! Middleware layer.
//!
//! Middleware intercepts a request on its way to the handler and the response
//! on its way back. It is the place for cross-cutting concerns: request logging,
//! request-id injection, path normalisation.
//!
//! A middleware receives the [`Request`] and a [`Next`]. Calling
//! [`Next::run`] hands the request to the rest of the chain and resolves to
//! its response; not calling it short-circuits.
//!
//! ```rust,no_run
//! use tsu_reqlog::{Request, Router, middleware::Next};
//!
//! async fn strip_trailing_slash(mut req: Request, next: Next) -> tsu_reqlog::Response {
//!     let trimmed = req.path().trim_end_matches('/').to_owned();
//!     if !trimmed.is_empty() && trimmed != req.path() {
//!         let _ = req.set_path(&trimmed);
//!     }
//!     next.run(req).await
//! }
//!
//! let app = Router::new().layer(strip_trailing_slash);
//! ```
//!
//! Built-in middleware:
//! - [`logger`] — one structured log line per request

pub mod logger;
pub mod skip;

use std::future::Future;
use std::sync::Arc;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::IntoResponse;
use crate::router::Router;

pub use logger::{LoggerConfig, Output, RequestLogger};
pub use skip::{SkipSet, build_skip_set};

/// Implemented by everything that can sit in the middleware chain.
///
/// Satisfied automatically by `async fn(Request, Next) -> impl IntoResponse`;
/// implement it by hand for middleware that carries state.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let fut = self(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the middleware chain, ending in the router.
pub struct Next {
    router: Arc<Router>,
    index: usize,
}

impl Next {
    pub(crate) fn new(router: Arc<Router>) -> Self {
        Self { router, index: 0 }
    }

    /// Passes `req` to the next middleware, or to the routed handler when
    /// this is the last one.
    pub async fn run(self, req: Request) -> crate::Response {
        let Some(middleware) = self.router.middleware.get(self.index).cloned() else {
            return self.router.route(req).await;
        };
        let next = Next { router: self.router, index: self.index + 1 };
        middleware.handle(req, next).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Response;
    use bytes::Bytes;
    use std::sync::Mutex;

    fn get(uri: &str) -> Request {
        http::Request::get(uri).body(Bytes::new()).unwrap().into()
    }

    #[tokio::test]
    async fn runs_outermost_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&order), Arc::clone(&order));
        let app = Arc::new(
            Router::new()
                .get("/", |_req: Request| async { "ok" })
                .layer(move |req: Request, next: Next| {
                    let order = Arc::clone(&a);
                    async move {
                        order.lock().unwrap().push("outer in");
                        let res = next.run(req).await;
                        order.lock().unwrap().push("outer out");
                        res
                    }
                })
                .layer(move |req: Request, next: Next| {
                    let order = Arc::clone(&b);
                    async move {
                        order.lock().unwrap().push("inner");
                        next.run(req).await
                    }
                }),
        );

        app.oneshot(get("/")).await;
        assert_eq!(*order.lock().unwrap(), ["outer in", "inner", "outer out"]);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        async fn deny(_req: Request, _next: Next) -> Response {
            Response::status(http::StatusCode::FORBIDDEN)
        }
        let app = Arc::new(Router::new().get("/", |_req: Request| async { "ok" }).layer(deny));
        assert_eq!(app.oneshot(get("/")).await.status_code(), http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rewritten_path_is_routed() {
        async fn rewrite(mut req: Request, next: Next) -> Response {
            req.set_path("/canonical").unwrap();
            next.run(req).await
        }
        let app = Arc::new(
            Router::new()
                .get("/canonical", |_req: Request| async { "canonical" })
                .layer(rewrite),
        );
        assert_eq!(app.oneshot(get("/alias")).await.body(), b"canonical");
    }
}

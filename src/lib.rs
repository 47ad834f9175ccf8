//! # tsu-reqlog
//!
//! A minimal HTTP framework for Rust services behind a reverse proxy, with
//! one piece of built-in middleware: a request logger that writes one JSON
//! line per request.
//!
//! ## The contract
//!
//! nginx handles TLS, rate limiting, slow clients and body-size limits. tsu
//! does not. What is left for tsu:
//!
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - A middleware chain — [`Router::layer`], [`middleware::Next`]
//! - Request logging — [`middleware::logger`], with a skip-list for health checks
//! - Client IPs from `X-Forwarded-For` / `X-Real-IP`, for trusted proxies only
//! - Graceful shutdown — SIGTERM / Ctrl-C, drains in-flight requests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_reqlog::{ErrorKind, Request, Response, Router, Server, Status};
//! use tsu_reqlog::middleware::logger::{self, LoggerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tsu_reqlog::Error> {
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .get("/healthz",    |_req: Request| async { "ok" })
//!         .layer(logger::logger_with_config(
//!             LoggerConfig::new().skip_path("/healthz"),
//!         ));
//!
//!     Server::bind("0.0.0.0:3000")
//!         .trust_proxy("10.0.0.2".parse().unwrap())
//!         .serve(app)
//!         .await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     match req.param("id") {
//!         Some(id) => Response::json(format!(r#"{{"id":"{id}"}}"#)),
//!         None => {
//!             req.error(ErrorKind::Private, "route matched without an id");
//!             Response::status(Status::INTERNAL_SERVER_ERROR)
//!         }
//!     }
//! }
//! ```

mod error;
mod handler;
mod request;
mod request_errors;
mod response;
mod router;
mod server;

pub mod client_ip;
pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use http::{Method, StatusCode as Status};
pub use request::Request;
pub use request_errors::{ErrorKind, Errors, RequestError};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;

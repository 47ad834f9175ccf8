//! Request logging middleware.
//!
//! Emits one JSON line per request once the rest of the chain has produced a
//! response:
//!
//! ```text
//! {"level":"INFO","message":"/users","StartTimestamp":"1760608800","ClientIP":"10.0.0.1","Method":"GET","Status":"200","BodySize":"120","ErrorMessage":"","Path":"/users","Query":"id=5"}
//! ```
//!
//! Every value is a string, numbers included; downstream log consumers parse
//! the fields as text. `ErrorMessage` holds the request's
//! [`ErrorKind::Private`] errors rendered by [`Errors::render`].
//!
//! `Path` and `Query` are read *before* the request is passed on, so a
//! middleware further in that rewrites the path does not change what is
//! logged or which paths are skipped.
//!
//! # Output
//!
//! Each [`RequestLogger`] owns its emitter: a `tracing` dispatcher writing to
//! the configured [`Output`], entered only while a request line is written.
//! The process-global subscriber is left alone, so the application's own
//! `tracing` setup never sees request lines and two loggers with different
//! outputs never redirect each other.
//!
//! ```rust,no_run
//! use tsu_reqlog::Router;
//! use tsu_reqlog::middleware::logger::{self, LoggerConfig, Output};
//!
//! let app = Router::new().layer(logger::logger_with_config(
//!     LoggerConfig::new()
//!         .output(Output::stderr())
//!         .skip_path("/healthz")
//!         .skip_path("/readyz"),
//! ));
//! ```
//!
//! [`ErrorKind::Private`]: crate::ErrorKind::Private
//! [`Errors::render`]: crate::Errors::render

use std::fmt;
use std::io::Write;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use http::{Method, StatusCode};
use tracing::{Dispatch, Level, info};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use super::skip::{SkipSet, build_skip_set};
use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::request_errors::ErrorKind;

// ── Output ────────────────────────────────────────────────────────────────────

/// Where request lines are written.
///
/// Requests are handled concurrently, so every output is safe to write from
/// many tasks at once: stdout and stderr lock per line, and arbitrary writers
/// are put behind a mutex.
pub struct Output(BoxMakeWriter);

impl Output {
    /// Standard output. The default.
    pub fn stdout() -> Self {
        Self(BoxMakeWriter::new(std::io::stdout))
    }

    pub fn stderr() -> Self {
        Self(BoxMakeWriter::new(std::io::stderr))
    }

    /// Any [`Write`] implementation (a file, a socket, a buffer), serialised
    /// through a mutex.
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self(BoxMakeWriter::new(Mutex::new(writer)))
    }

    /// A `tracing-subscriber` writer factory that does its own
    /// synchronisation, e.g. a `tracing_appender` non-blocking writer.
    pub fn make_writer<M>(make_writer: M) -> Self
    where
        M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self(BoxMakeWriter::new(make_writer))
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Construction-time settings for [`RequestLogger`].
#[derive(Debug, Default)]
pub struct LoggerConfig {
    /// Destination for request lines; [`Output::stdout`] when `None`.
    pub output: Option<Output>,
    /// Request paths that are never logged. Exact match only.
    pub skip_paths: Vec<String>,
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }

    pub fn skip_path(mut self, path: impl Into<String>) -> Self {
        self.skip_paths.push(path.into());
        self
    }

    pub fn skip_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_paths.extend(paths.into_iter().map(Into::into));
        self
    }
}

// ── Constructors ──────────────────────────────────────────────────────────────

/// Logs every request to stdout.
pub fn logger() -> RequestLogger {
    logger_with_config(LoggerConfig::default())
}

/// Logs to `output`, except requests whose path is in `skip_paths`.
pub fn logger_with_writer<I, S>(output: Output, skip_paths: I) -> RequestLogger
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    logger_with_config(LoggerConfig::new().output(output).skip_paths(skip_paths))
}

pub fn logger_with_config(config: LoggerConfig) -> RequestLogger {
    let output = config.output.unwrap_or_default();
    RequestLogger {
        skip: Arc::new(build_skip_set(config.skip_paths)),
        emitter: emitter(output),
    }
}

fn emitter(output: Output) -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .without_time()
        .with_target(false)
        .with_max_level(Level::INFO)
        .with_writer(output.0)
        .finish();
    Dispatch::new(subscriber)
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// The request logging middleware. Register with
/// [`Router::layer`](crate::Router::layer).
///
/// Cloning is cheap and clones share the skip set and the output.
#[derive(Clone, Debug)]
pub struct RequestLogger {
    skip: Arc<SkipSet>,
    emitter: Dispatch,
}

impl RequestLogger {
    pub fn skip_set(&self) -> &SkipSet {
        &self.skip
    }

    fn emit(&self, line: &Line) {
        tracing::dispatcher::with_default(&self.emitter, || line.emit());
    }
}

impl Middleware for RequestLogger {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let logger = self.clone();
        Box::pin(async move {
            let start = Utc::now();
            let path = req.path().to_owned();
            let query = req.query().to_owned();
            let method = req.method().clone();
            let client_ip = req.client_ip();
            let errors = req.errors().clone();

            let response = next.run(req).await;

            if logger.skip.contains(&path) {
                return response;
            }

            logger.emit(&Line {
                start,
                client_ip,
                method,
                status: response.status_code(),
                body_size: response.body_size(),
                error_message: errors.render(ErrorKind::Private),
                path,
                query,
            });
            response
        })
    }
}

/// Everything one log line needs, gathered around the downstream call.
struct Line {
    start: DateTime<Utc>,
    client_ip: Option<IpAddr>,
    method: Method,
    status: StatusCode,
    body_size: usize,
    error_message: String,
    path: String,
    query: String,
}

impl Line {
    fn emit(&self) {
        let client_ip = self.client_ip.map(|ip| ip.to_string()).unwrap_or_default();
        info!(
            StartTimestamp = %self.start.timestamp(),
            ClientIP = client_ip.as_str(),
            Method = self.method.as_str(),
            Status = %self.status.as_u16(),
            BodySize = %self.body_size,
            ErrorMessage = self.error_message.as_str(),
            Path = self.path.as_str(),
            Query = self.query.as_str(),
            "{}",
            self.path,
        );
    }
}

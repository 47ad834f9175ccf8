//! Request-scoped error list.
//!
//! Handlers and middleware record failures on the request they are working
//! on instead of returning them. The list travels with the request through
//! the middleware chain; anyone who cloned the [`Errors`] handle before
//! calling [`Next::run`](crate::middleware::Next::run) sees what downstream
//! code recorded once it returns.
//!
//! ```rust
//! use tsu_reqlog::{ErrorKind, Request, Response, Status};
//!
//! async fn list_orders(req: Request) -> Response {
//!     // ... the database call timed out
//!     req.error(ErrorKind::Private, "db timeout");
//!     Response::status(Status::SERVICE_UNAVAILABLE)
//! }
//! ```

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Who an error is meant for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Internal detail: goes to logs, never to the client.
    Private,
    /// Safe to surface in a response body.
    Public,
}

/// One recorded error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestError {
    kind: ErrorKind,
    message: String,
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind { self.kind }
    pub fn message(&self) -> &str { &self.message }
}

/// Shared, append-only list of errors recorded while handling one request.
///
/// Cloning is one `Arc` increment; every clone sees the same list.
#[derive(Clone, Debug, Default)]
pub struct Errors(Arc<Mutex<Vec<RequestError>>>);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error. Insertion order is preserved.
    pub fn push(&self, kind: ErrorKind, message: impl Into<String>) {
        self.lock().push(RequestError { kind, message: message.into() });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the errors of `kind`, in the order they were recorded.
    pub fn by_kind(&self, kind: ErrorKind) -> Vec<RequestError> {
        self.lock().iter().filter(|e| e.kind == kind).cloned().collect()
    }

    /// Renders the errors of `kind` as one line each:
    ///
    /// ```text
    /// Error #01: db timeout
    /// Error #02: retry budget exhausted
    /// ```
    ///
    /// Returns an empty string when nothing of that kind was recorded.
    pub fn render(&self, kind: ErrorKind) -> String {
        let mut out = String::new();
        for (i, err) in self.by_kind(kind).iter().enumerate() {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "Error #{:02}: {}", i + 1, err.message);
        }
        out
    }

    // A panicking writer can only have left a fully pushed or untouched Vec
    // behind, so a poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, Vec<RequestError>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

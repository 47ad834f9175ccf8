//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. Middleware further up
//! the chain can still read its status and body size after the handler ran,
//! which is all the request logger needs.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::error;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use tsu_reqlog::{Response, Status};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(Status::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use tsu_reqlog::{Response, Status};
///
/// Response::builder()
///     .status(Status::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: HeaderMap,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: HeaderMap::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK, malformed: false }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Number of body bytes that will be written to the client.
    pub fn body_size(&self) -> usize { self.body.len() }

    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Converts to the hyper representation. Headers were validated when the
    /// response was built, so what is written is exactly what middleware saw.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
///
/// A header name or value that is not valid HTTP turns the finished response
/// into a bare `500 Internal Server Error`, and that is what gets sent and
/// logged.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
    malformed: bool,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => {
                error!(header = name, "malformed response header, answering 500");
                self.malformed = true;
            }
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish("application/json", body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", Bytes::from(body.into()))
    }

    /// Terminate with no body (e.g. `204 No Content`, `301 Moved Permanently`).
    pub fn no_body(self) -> Response {
        if self.malformed {
            return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }

    fn finish(mut self, content_type: &'static str, body: Bytes) -> Response {
        if self.malformed {
            return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        self.headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(content_type));
        Response { body, headers: self.headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return Status::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_size_counts_bytes() {
        assert_eq!(Response::text("héllo").body_size(), 6);
        assert_eq!(Response::status(StatusCode::NO_CONTENT).body_size(), 0);
    }

    #[test]
    fn builder_keeps_status_and_headers() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/42")
            .json(&b"{}"[..]);
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.header("Location"), Some("/users/42"));
        assert_eq!(res.header("content-type"), Some("application/json"));
    }

    #[test]
    fn malformed_header_is_500_before_it_leaves_the_handler() {
        let res = Response::builder().header("bad header", "x").text("ok");
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body_size(), 0);
        assert!(res.header("content-type").is_none());

        let wire = res.into_inner();
        assert_eq!(wire.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn malformed_header_value_is_500() {
        let res = Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header("location", "/next\r\nx-injected: 1")
            .no_body();
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn no_body_keeps_status_and_headers() {
        let res = Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header("location", "/users/42")
            .no_body();
        assert_eq!(res.status_code(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.header("location"), Some("/users/42"));
        assert_eq!(res.body_size(), 0);
    }

    #[test]
    fn explicit_content_type_wins() {
        let res = Response::builder()
            .header("content-type", "application/problem+json")
            .json(&b"{}"[..]);
        assert_eq!(res.header("content-type"), Some("application/problem+json"));
        assert_eq!(res.headers().get_all("content-type").iter().count(), 1);
    }
}

//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::client_ip::{self, TrustedProxies};
use crate::request_errors::{ErrorKind, Errors};

/// An incoming HTTP request with its body already collected.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) trusted_proxies: Arc<TrustedProxies>,
    pub(crate) errors: Errors,
    pub(crate) body_rejected: bool,
}

impl Request {
    pub(crate) fn new(
        parts: Parts,
        body: Bytes,
        remote_addr: SocketAddr,
        trusted_proxies: Arc<TrustedProxies>,
    ) -> Self {
        Self {
            parts,
            body,
            params: HashMap::new(),
            remote_addr: Some(remote_addr),
            trusted_proxies,
            errors: Errors::new(),
            body_rejected: false,
        }
    }

    /// Marks the body as unreadable. The request still walks the middleware
    /// chain, so it is logged; the router answers `400` instead of calling a
    /// handler.
    pub(crate) fn reject_body(&mut self, reason: impl Into<String>) {
        self.body = Bytes::new();
        self.body_rejected = true;
        self.errors.push(ErrorKind::Private, reason);
    }

    /// Sets the TCP peer address. Requests built with [`From`] have none.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Raw query string without the leading `?`; empty when there is none.
    pub fn query(&self) -> &str {
        self.parts.uri.query().unwrap_or("")
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    /// Parameters are filled in once routing happens, so middleware sees none.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The client address, honouring `X-Forwarded-For` / `X-Real-IP` only
    /// when the peer is a trusted proxy. See [`crate::client_ip`].
    pub fn client_ip(&self) -> Option<IpAddr> {
        client_ip::resolve(
            self.remote_addr.map(|a| a.ip()),
            &self.parts.headers,
            &self.trusted_proxies,
        )
    }

    /// Rewrites the request path, keeping the query string.
    ///
    /// Middleware uses this for route normalisation before the router runs.
    pub fn set_path(&mut self, path: &str) -> Result<(), http::Error> {
        let path_and_query = match self.parts.uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_owned(),
        };
        let mut uri = self.parts.uri.clone().into_parts();
        uri.path_and_query = Some(path_and_query.parse()?);
        self.parts.uri = Uri::from_parts(uri)?;
        Ok(())
    }

    /// Records an error against this request. See [`Errors`].
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) {
        self.errors.push(kind, message);
    }

    /// The request's error list. Clone it to keep reading after the request
    /// has been handed down the chain.
    pub fn errors(&self) -> &Errors {
        &self.errors
    }
}

/// Builds a request in-process, without a socket. Used by tests and by
/// [`Router::oneshot`](crate::Router::oneshot).
impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body: body.into(),
            params: HashMap::new(),
            remote_addr: None,
            trusted_proxies: Arc::default(),
            errors: Errors::new(),
            body_rejected: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> Request {
        http::Request::get(uri).body(Bytes::new()).unwrap().into()
    }

    #[test]
    fn query_is_raw_and_defaults_to_empty() {
        assert_eq!(get("/users?id=5&sort=desc").query(), "id=5&sort=desc");
        assert_eq!(get("/users").query(), "");
    }

    #[test]
    fn set_path_keeps_query() {
        let mut req = get("/Users/?id=5");
        req.set_path("/users").unwrap();
        assert_eq!(req.path(), "/users");
        assert_eq!(req.query(), "id=5");
    }

    #[test]
    fn set_path_rejects_invalid_paths() {
        let mut req = get("/users");
        assert!(req.set_path("/bad path").is_err());
        assert_eq!(req.path(), "/users");
    }

    #[test]
    fn client_ip_is_the_peer_by_default() {
        let req = get("/").with_remote_addr("10.0.0.1:5555".parse().unwrap());
        assert_eq!(req.client_ip(), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(get("/").client_ip(), None);
    }

    #[test]
    fn rejected_body_is_recorded_as_private_error() {
        let mut req = get("/up");
        req.reject_body("failed to read request body: bad chunk");
        assert!(req.body_rejected);
        assert!(req.body().is_empty());
        assert_eq!(
            req.errors().render(ErrorKind::Private),
            "Error #01: failed to read request body: bad chunk\n",
        );
    }

    #[test]
    fn errors_are_visible_through_a_cloned_handle() {
        let req = get("/orders");
        let errors = req.errors().clone();
        req.error(ErrorKind::Private, "db timeout");
        drop(req);
        assert_eq!(errors.render(ErrorKind::Private), "Error #01: db timeout\n");
    }
}

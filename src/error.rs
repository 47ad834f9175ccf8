//! Unified error type.

/// The error type returned by tsu's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, and per-request failures are recorded
/// on the request's [`Errors`](crate::Errors) list. This type only surfaces
/// infrastructure failures: a bad bind address or a socket that won't open.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert_eq!(err.to_string(), "io: taken");
    }

    #[test]
    fn invalid_address_names_the_input() {
        let source = "nope".parse::<std::net::SocketAddr>().unwrap_err();
        let err = Error::InvalidAddress { addr: "nope".to_owned(), source };
        assert!(err.to_string().starts_with("invalid socket address `nope`"));
    }
}

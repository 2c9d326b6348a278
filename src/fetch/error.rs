//! Fetch error types.

use std::path::PathBuf;

/// Errors from the HTTP layer and the disk cache.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure (connection, timeout, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid protocol {protocol:?} ({url})")]
    InvalidProtocol { url: String, protocol: String },

    #[error("missing host ({url})")]
    MissingHost { url: String },

    #[error("port {port} is not allowed ({url})")]
    PortNotAllowed { url: String, port: u16 },

    #[error("redirecting response was missing \"Location\" header ({url})")]
    MissingLocation { url: String },

    #[error("too many repeated redirects ({url})")]
    TooManyRedirects { url: String },

    /// Server answered with a client or server error status
    #[error("{status} - {url} ({excerpt})")]
    Status {
        status: u16,
        url: String,
        excerpt: String,
    },

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fetch finished without leaving a readable cache entry. This is a bug,
    /// not a network condition.
    #[error("missing cache entry {}", .path.display())]
    MissingCacheEntry { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FetchError::Status {
            status: 404,
            url: "http://example.test/x".into(),
            excerpt: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "404 - http://example.test/x (Not Found)");

        let err = FetchError::PortNotAllowed {
            url: "http://example.test:22/".into(),
            port: 22,
        };
        assert!(err.to_string().contains("port 22"));

        let err = FetchError::MissingCacheEntry {
            path: PathBuf::from("/tmp/cache/x"),
        };
        assert_eq!(err.to_string(), "missing cache entry /tmp/cache/x");
    }
}

//! Error types for the chameleon crate.

use std::fmt;
use std::io;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error used for request bodies supplied by callers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stage of a round trip that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Opening the transport stream.
    Dial,
    /// TLS handshake.
    Handshake,
    /// Sending the request and receiving response headers.
    Exchange,
    /// Caller-supplied deadline attached to the request.
    Deadline,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dial => "dial",
            Self::Handshake => "TLS handshake",
            Self::Exchange => "HTTP exchange",
            Self::Deadline => "request deadline",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while performing a fingerprinted round trip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Profile identifier is not registered in the catalog.
    #[error("Unknown ClientHello profile: {0}")]
    UnknownProfile(String),

    /// Dial failure or connection-level I/O failure (refused, reset, unreachable).
    #[error("Network error: {0}")]
    Network(String),

    /// The peer certificate was rejected by the verifier.
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// TLS protocol failure (version/cipher mismatch, peer abort, bad ALPN).
    #[error("TLS handshake error: {0}")]
    Handshake(String),

    /// A stage exceeded its deadline.
    #[error("Operation timed out during {0}")]
    Timeout(TimeoutPhase),

    /// Malformed HTTP/1.1 or HTTP/2 data from the peer.
    #[error("HTTP framing error: {0}")]
    ProtocolFraming(String),

    /// Request cannot be sent (missing host, unsupported scheme, bad header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// TLS engine configuration failed before any I/O took place.
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// Any other round-trip failure.
    #[error("Round trip failed: {0}")]
    RoundTrip(String),
}

impl Error {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a handshake error.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake(message.into())
    }

    /// Create a TLS configuration error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Whether a fresh dial may succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Handshake(_))
    }

    /// Whether this error is a timeout of any phase.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Classify an error surfaced by hyper while exchanging a request.
    pub(crate) fn from_hyper(err: hyper::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(TimeoutPhase::Exchange);
        }
        if err.is_parse() || err.is_parse_status() {
            return Self::ProtocolFraming(err.to_string());
        }
        if err.is_canceled() || err.is_closed() || err.is_incomplete_message() {
            return Self::Network(err.to_string());
        }
        if has_io_source(&err) {
            return Self::Network(err.to_string());
        }
        if err.is_user() {
            return Self::InvalidRequest(err.to_string());
        }
        Self::RoundTrip(err.to_string())
    }
}

fn has_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if inner.is::<io::Error>() {
            return true;
        }
        source = inner.source();
    }
    false
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Network(err.to_string())
    }
}

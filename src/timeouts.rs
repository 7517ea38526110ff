//! Timeout configuration for round trips.
//!
//! - **dial**: opening the transport stream (DNS + TCP, or whatever the dialer does)
//! - **handshake**: the TLS handshake on an open stream
//! - **exchange**: request sent → response headers received
//!
//! A caller can additionally bound a single request with a [`Deadline`] extension.
//!
//! ```rust,ignore
//! use chameleon::{RoundTripper, Timeouts};
//! use std::time::Duration;
//!
//! let rt = RoundTripper::builder("hellochrome_auto")
//!     .timeouts(Timeouts::new().handshake(Duration::from_secs(5)))
//!     .build()?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result, TimeoutPhase};

/// Per-phase timeouts. `None` disables the timeout for that phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub dial: Option<Duration>,
    pub handshake: Option<Duration>,
    /// Does NOT cover reading the response body, which is streamed to the caller.
    pub exchange: Option<Duration>,
}

impl Timeouts {
    /// Create a new Timeouts with all timeouts set to None.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensible defaults for normal API calls.
    ///
    /// - dial: 10s
    /// - handshake: 10s
    /// - exchange: 30s
    pub fn api_defaults() -> Self {
        Self {
            dial: Some(Duration::from_secs(10)),
            handshake: Some(Duration::from_secs(10)),
            exchange: Some(Duration::from_secs(30)),
        }
    }

    /// Set dial timeout.
    pub fn dial(mut self, timeout: Duration) -> Self {
        self.dial = Some(timeout);
        self
    }

    /// Set TLS handshake timeout.
    pub fn handshake(mut self, timeout: Duration) -> Self {
        self.handshake = Some(timeout);
        self
    }

    /// Set exchange (time-to-headers) timeout.
    pub fn exchange(mut self, timeout: Duration) -> Self {
        self.exchange = Some(timeout);
        self
    }
}

/// Absolute deadline for one request, attached as a request extension.
///
/// ```rust,ignore
/// let mut req = http::Request::get(url).body(Empty::<Bytes>::new())?;
/// req.extensions_mut().insert(Deadline::after(Duration::from_secs(3)));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline(pub tokio::time::Instant);

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self(tokio::time::Instant::now() + duration)
    }
}

/// Run `fut` under an optional timeout, reporting `phase` when it expires.
///
/// The future is dropped on expiry, which closes any socket it owns.
pub(crate) async fn with_timeout<T, F>(limit: Option<Duration>, phase: TimeoutPhase, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(duration) => tokio::time::timeout(duration, fut)
            .await
            .map_err(|_| Error::Timeout(phase))?,
        None => fut.await,
    }
}

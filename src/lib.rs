//! # Chameleon
//!
//! HTTP round tripper whose TLS ClientHello impersonates a real browser.
//!
//! Each [`RoundTripper`] is bound to one profile from the catalog (Firefox, Chrome and iOS
//! Safari releases) and negotiates HTTP/1.1 or HTTP/2 through ALPN exactly as that browser
//! would advertise it.

pub mod client;
pub mod error;
pub mod fingerprint;
pub mod pool;
pub mod timeouts;
pub mod transport;

// Re-exports
pub use client::{RoundTripper, RoundTripperBuilder};
pub use error::{BoxError, Error, Result, TimeoutPhase};
pub use fingerprint::{identifiers, resolve, ClientHelloProfile, Http2Settings};
pub use pool::{ConnectionCache, PoolStats};
pub use timeouts::{Deadline, Timeouts};
pub use transport::{AlpnProtocol, Dialer, TcpDialer, TlsOptions};

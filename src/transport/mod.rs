//! Connection establishment and HTTP exchange.
//!
//! - `tcp`: pluggable dialing
//! - `connector`: fingerprinted BoringSSL handshakes via tokio-boring
//! - `exchange`: HTTP/1.1 and HTTP/2 over hyper

pub mod connector;
pub mod exchange;
pub mod tcp;

pub use connector::{AlpnProtocol, DialTarget, EstablishedConnection, FingerprintedConnector, TlsOptions};
pub use exchange::{Exchanger, RequestBody};
pub use tcp::{BoxedIo, Dialer, TcpDialer};

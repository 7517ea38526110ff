//! ClientHello and HTTP/2 fingerprint profiles.

pub mod http2;
pub mod profiles;
pub mod tls;

pub use http2::Http2Settings;
pub use profiles::{identifiers, resolve, CATALOG_VERSION};
pub use tls::{CertCompression, ClientHelloProfile, Extension, NamedGroup, SignatureScheme, TlsVersion};

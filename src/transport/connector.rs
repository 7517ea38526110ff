//! Fingerprinted BoringSSL connector.
//!
//! Turns a [`ClientHelloProfile`] into BoringSSL settings, dials the target and drives the
//! handshake. Extension permutation stays off so every handshake for a profile carries the
//! same ordering.

use std::fmt;
use std::io::{self, Read};
use std::os::raw::c_int;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use boring::ssl::{ErrorCode, SslConnector, SslMethod, SslOptions, SslRef, SslVerifyMode};
use boring::x509::X509;
use boring_sys::{CRYPTO_BUFFER, SSL, SSL_CTX};
use http::Uri;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_boring::{HandshakeError, SslStream};

use crate::error::{Error, Result, TimeoutPhase};
use crate::fingerprint::{CertCompression, ClientHelloProfile, Extension};
use crate::timeouts::{with_timeout, Timeouts};
use crate::transport::tcp::{BoxedIo, Dialer, TcpDialer};

/// Brotli certificate decompression callback for BoringSSL.
///
/// Called when the server sends a Brotli-compressed Certificate message.
unsafe extern "C" fn decompress_brotli_cert(
    _ssl: *mut SSL,
    out: *mut *mut CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let compressed = std::slice::from_raw_parts(in_, in_len);

    let mut decompressed = Vec::with_capacity(uncompressed_len);
    let mut decoder = brotli::Decompressor::new(compressed, 4096);
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) if decompressed.len() == uncompressed_len => {
            // CRYPTO_BUFFER_new copies the data
            let buffer = boring_sys::CRYPTO_BUFFER_new(
                decompressed.as_ptr(),
                decompressed.len(),
                std::ptr::null_mut(),
            );
            if buffer.is_null() {
                return 0;
            }
            *out = buffer;
            1
        }
        _ => 0,
    }
}

/// Caller-controlled TLS settings layered on top of the profile.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Extra trust anchors (DER or PEM), added to the system store.
    pub root_certs: Vec<Vec<u8>>,
    /// Accept any certificate. Only for controlled test setups.
    pub skip_verify: bool,
    /// Name used for SNI and hostname verification instead of the URI host.
    pub server_name: Option<String>,
}

impl TlsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trusted root certificate (DER or PEM).
    pub fn add_root_certificate(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.root_certs.push(cert.into());
        self
    }

    /// Disable certificate verification.
    pub fn danger_skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    /// Override the server name sent in SNI and checked against the certificate.
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// Where to connect and how.
#[derive(Debug, Clone)]
pub struct DialTarget {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub options: Arc<TlsOptions>,
}

impl DialTarget {
    /// Derive a target from an absolute `http`/`https` URI.
    pub fn from_uri(uri: &Uri, options: Arc<TlsOptions>) -> Result<Self> {
        let tls = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            Some(other) => {
                return Err(Error::invalid_request(format!(
                    "Unsupported scheme: {}",
                    other
                )))
            }
            None => return Err(Error::invalid_request("Missing scheme")),
        };
        let host = uri
            .host()
            .ok_or_else(|| Error::invalid_request("Missing host"))?;
        // Strip IPv6 brackets for dialing and SNI
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });
        Ok(Self {
            host,
            port,
            tls,
            options,
        })
    }

    /// Name used for SNI and certificate verification.
    pub fn server_name(&self) -> &str {
        self.options.server_name.as_deref().unwrap_or(&self.host)
    }
}

/// Application protocol chosen for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlpnProtocol {
    /// HTTP/2 ("h2")
    H2,
    /// HTTP/1.1, including every non-h2 ALPN value
    Http1,
}

impl AlpnProtocol {
    /// Map a negotiated ALPN value; anything but `h2` is spoken as HTTP/1.1.
    pub fn from_wire(proto: &[u8]) -> Self {
        if proto == b"h2" {
            Self::H2
        } else {
            Self::Http1
        }
    }

    /// Protocol used when the server did not select any ALPN value: the least preferred
    /// protocol the profile advertised.
    pub fn fallback_for(profile: &ClientHelloProfile) -> Self {
        match profile.alpn_protocols().last() {
            Some(&"h2") => Self::H2,
            _ => Self::Http1,
        }
    }

    pub fn is_h2(&self) -> bool {
        matches!(self, Self::H2)
    }

    pub fn is_http1(&self) -> bool {
        matches!(self, Self::Http1)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H2 => "HTTP/2",
            Self::Http1 => "HTTP/1.1",
        }
    }
}

/// Stream that can be either plain or TLS-wrapped.
#[derive(Debug)]
pub enum MaybeHttpsStream {
    Http(BoxedIo),
    Https(SslStream<BoxedIo>),
}

impl AsyncRead for MaybeHttpsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeHttpsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_flush(cx),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// A connected, protocol-negotiated stream.
pub struct EstablishedConnection {
    stream: MaybeHttpsStream,
    protocol: AlpnProtocol,
    negotiated_alpn: Option<String>,
    tls_version: Option<&'static str>,
}

impl EstablishedConnection {
    /// Protocol the adapter will speak.
    pub fn protocol(&self) -> AlpnProtocol {
        self.protocol
    }

    /// Raw ALPN value the server selected, if any.
    pub fn negotiated_alpn(&self) -> Option<&str> {
        self.negotiated_alpn.as_deref()
    }

    /// e.g. `TLSv1.3`; `None` for plain connections.
    pub fn tls_version(&self) -> Option<&'static str> {
        self.tls_version
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.stream, MaybeHttpsStream::Https(_))
    }

    pub fn into_stream(self) -> MaybeHttpsStream {
        self.stream
    }
}

impl fmt::Debug for EstablishedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstablishedConnection")
            .field("protocol", &self.protocol)
            .field("negotiated_alpn", &self.negotiated_alpn)
            .field("tls_version", &self.tls_version)
            .finish()
    }
}

/// Dials targets and performs fingerprinted TLS handshakes. Never retries.
#[derive(Clone)]
pub struct FingerprintedConnector {
    dialer: Arc<dyn Dialer>,
    timeouts: Timeouts,
}

impl FingerprintedConnector {
    pub fn new(dialer: Arc<dyn Dialer>, timeouts: Timeouts) -> Self {
        Self { dialer, timeouts }
    }

    /// Open a stream to `target` and, for TLS targets, handshake with `profile`.
    pub async fn connect(
        &self,
        target: &DialTarget,
        profile: &ClientHelloProfile,
    ) -> Result<EstablishedConnection> {
        let connector = configure_ssl(profile, &target.options)?;
        self.connect_with(target, profile, &connector).await
    }

    /// Like [`connect`](Self::connect), reusing a connector built by [`configure_ssl`] for
    /// the same profile and `target.options`.
    pub async fn connect_with(
        &self,
        target: &DialTarget,
        profile: &ClientHelloProfile,
        connector: &SslConnector,
    ) -> Result<EstablishedConnection> {
        let stream = with_timeout(self.timeouts.dial, TimeoutPhase::Dial, async {
            self.dialer
                .dial(&target.host, target.port)
                .await
                .map_err(|e| {
                    Error::network(format!(
                        "Failed to connect to {}:{}: {}",
                        target.host, target.port, e
                    ))
                })
        })
        .await?;

        if !target.tls {
            return Ok(EstablishedConnection {
                stream: MaybeHttpsStream::Http(stream),
                protocol: AlpnProtocol::Http1,
                negotiated_alpn: None,
                tls_version: None,
            });
        }

        let mut config = connector
            .configure()
            .map_err(|e| Error::tls(format!("Failed to configure SSL: {}", e)))?;
        config.set_use_server_name_indication(profile.sends_sni());
        if target.options.skip_verify {
            config.set_verify_hostname(false);
        }

        let server_name = target.server_name();
        let skip_verify = target.options.skip_verify;
        let ssl_stream = with_timeout(self.timeouts.handshake, TimeoutPhase::Handshake, async {
            tokio_boring::connect(config, server_name, stream)
                .await
                .map_err(|e| classify_handshake_error(e, skip_verify))
        })
        .await?;

        let selected = ssl_stream
            .ssl()
            .selected_alpn_protocol()
            .map(|p| String::from_utf8_lossy(p).into_owned());
        let protocol = negotiated_protocol(profile, selected.as_deref())?;
        let tls_version = Some(ssl_stream.ssl().version_str());

        tracing::debug!(
            "TLS established with {}:{} as {} ({:?}, ALPN {:?})",
            target.host,
            target.port,
            profile.name,
            tls_version,
            selected
        );

        Ok(EstablishedConnection {
            stream: MaybeHttpsStream::Https(ssl_stream),
            protocol,
            negotiated_alpn: selected,
            tls_version,
        })
    }
}

impl Default for FingerprintedConnector {
    fn default() -> Self {
        Self::new(Arc::new(TcpDialer::new()), Timeouts::default())
    }
}

/// Check the server's ALPN choice against what the profile advertised.
pub fn negotiated_protocol(
    profile: &ClientHelloProfile,
    selected: Option<&str>,
) -> Result<AlpnProtocol> {
    match selected {
        None => Ok(AlpnProtocol::fallback_for(profile)),
        Some(proto) if profile.alpn_protocols().iter().any(|p| *p == proto) => {
            Ok(AlpnProtocol::from_wire(proto.as_bytes()))
        }
        Some(proto) => Err(Error::handshake(format!(
            "Server selected ALPN {:?} not advertised by {}",
            proto, profile.name
        ))),
    }
}

fn classify_handshake_error(err: HandshakeError<BoxedIo>, skip_verify: bool) -> Error {
    if let Some(io_err) = err.as_io_error() {
        return Error::network(format!("TLS handshake I/O failed: {}", io_err));
    }
    if err.code() == Some(ErrorCode::SYSCALL) {
        return Error::network(format!("TLS handshake transport failed: {}", err));
    }
    if !skip_verify {
        if let Some(reason) = err.ssl().and_then(rejected_certificate) {
            return Error::Certificate(reason);
        }
        let detail = err.to_string();
        if detail.contains("CERTIFICATE_VERIFY_FAILED") {
            return Error::Certificate(detail);
        }
    }
    Error::handshake(err.to_string())
}

/// Verification failure of a certificate the peer actually presented.
///
/// Sessions start out as `X509_V_ERR_INVALID_CALL`, so a handshake that died before the
/// certificate arrived reports an error without any verification having run.
fn rejected_certificate(ssl: &SslRef) -> Option<String> {
    ssl.peer_certificate()?;
    match ssl.verify_result() {
        Err(verify) if verify.as_raw() != boring_sys::X509_V_ERR_INVALID_CALL as c_int => {
            Some(verify.error_string().to_string())
        }
        _ => None,
    }
}

/// Build a BoringSSL connector shaped after `profile`.
pub fn configure_ssl(profile: &ClientHelloProfile, options: &TlsOptions) -> Result<SslConnector> {
    let mut builder = SslConnector::builder(SslMethod::tls_client())
        .map_err(|e| Error::tls(format!("Failed to create SSL connector: {}", e)))?;

    for cert_bytes in &options.root_certs {
        let cert = X509::from_der(cert_bytes).or_else(|_| X509::from_pem(cert_bytes));
        match cert {
            Ok(cert) => builder
                .cert_store_mut()
                .add_cert(cert)
                .map_err(|e| Error::tls(format!("Failed to add root certificate: {}", e)))?,
            Err(e) => tracing::warn!("Ignoring unparsable root certificate: {}", e),
        }
    }

    if options.skip_verify {
        builder.set_verify(SslVerifyMode::NONE);
    }

    let (min, max) = profile.version_range();
    builder
        .set_min_proto_version(min.to_ssl_version())
        .map_err(|e| Error::tls(format!("Failed to set min TLS version: {}", e)))?;
    builder
        .set_max_proto_version(max.to_ssl_version())
        .map_err(|e| Error::tls(format!("Failed to set max TLS version: {}", e)))?;

    // TLS 1.3 suites are fixed by BoringSSL; this orders the TLS 1.2 ones
    let ciphers = profile.cipher_string();
    if !ciphers.is_empty() {
        builder
            .set_cipher_list(&ciphers)
            .map_err(|e| Error::tls(format!("Failed to set cipher list: {}", e)))?;
    }

    let curves = profile.curves_string();
    if !curves.is_empty() {
        builder
            .set_curves_list(&curves)
            .map_err(|e| Error::tls(format!("Failed to set curves: {}", e)))?;
    }

    let sigalgs = profile.sigalgs_string();
    if !sigalgs.is_empty() {
        builder
            .set_sigalgs_list(&sigalgs)
            .map_err(|e| Error::tls(format!("Failed to set signature algorithms: {}", e)))?;
    }

    builder.set_grease_enabled(profile.grease());
    builder.set_permute_extensions(false);

    if profile.has(|e| matches!(e, Extension::StatusRequest)) {
        builder.enable_ocsp_stapling();
    }
    if profile.has(|e| matches!(e, Extension::SignedCertificateTimestamp)) {
        builder.enable_signed_cert_timestamps();
    }
    if !profile.has(|e| matches!(e, Extension::SessionTicket)) {
        builder.set_options(SslOptions::NO_TICKET);
    }

    for alg in profile.cert_compression() {
        // Only decompression is registered: clients never compress their certificates
        let added = match alg {
            CertCompression::Brotli => unsafe {
                let ctx = builder.as_ptr() as *mut SSL_CTX;
                boring_sys::SSL_CTX_add_cert_compression_alg(
                    ctx,
                    boring_sys::TLSEXT_cert_compression_brotli as u16,
                    None,
                    Some(decompress_brotli_cert),
                )
            },
            CertCompression::Zlib => {
                tracing::warn!("{}: zlib certificate compression is not offered", profile.name);
                continue;
            }
        };
        if added == 0 {
            return Err(Error::tls("Failed to register certificate compression"));
        }
    }

    let alpn = profile.alpn_wire();
    if !alpn.is_empty() {
        builder
            .set_alpn_protos(&alpn)
            .map_err(|e| Error::tls(format!("Failed to set ALPN: {}", e)))?;
    }

    Ok(builder.build())
}

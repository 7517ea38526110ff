//! Transport-layer dialing.
//!
//! The connector never opens sockets itself; it asks a [`Dialer`]. The default
//! [`TcpDialer`] resolves the host with Tokio and applies socket options through socket2.
//! Callers that need proxies or custom resolution plug in their own implementation.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Byte stream a dialer may hand back.
pub trait Io: AsyncRead + AsyncWrite + fmt::Debug + Send + Unpin + 'static {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + fmt::Debug + Send + Unpin + 'static {}

/// Type-erased dialed stream.
pub type BoxedIo = Box<dyn Io>;

/// Future returned by [`Dialer::dial`].
pub type DialFuture<'a> = Pin<Box<dyn Future<Output = io::Result<BoxedIo>> + Send + 'a>>;

/// Opens the byte stream the TLS handshake runs over.
pub trait Dialer: Send + Sync + 'static {
    fn dial<'a>(&'a self, host: &'a str, port: u16) -> DialFuture<'a>;
}

/// Default dialer: plain TCP with `TCP_NODELAY` and optional keepalive.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    nodelay: bool,
    keepalive: Option<Duration>,
}

impl TcpDialer {
    pub fn new() -> Self {
        Self {
            nodelay: true,
            keepalive: Some(Duration::from_secs(30)),
        }
    }

    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Keepalive idle time; `None` leaves the OS default.
    pub fn keepalive(mut self, idle: Option<Duration>) -> Self {
        self.keepalive = idle;
        self
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;
        if let Some(idle) = self.keepalive {
            SockRef::from(stream).set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
        }
        Ok(())
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialer for TcpDialer {
    fn dial<'a>(&'a self, host: &'a str, port: u16) -> DialFuture<'a> {
        Box::pin(async move {
            // tokio tries every resolved address in turn
            let stream = TcpStream::connect((host, port)).await?;
            self.configure(&stream)?;
            tracing::trace!(
                "Dialed {}:{} (local {:?})",
                host,
                port,
                stream.local_addr().ok()
            );
            Ok(Box::new(stream) as BoxedIo)
        })
    }
}

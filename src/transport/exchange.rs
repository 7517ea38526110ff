//! HTTP/1.1 and HTTP/2 exchange over an established connection via hyper.
//!
//! The connection driver runs on its own task; the [`Exchanger`] holds the request
//! sender. HTTP/2 senders are cheap to clone and multiplex, HTTP/1.1 senders carry one
//! request at a time.

use bytes::Bytes;
use http::header::{HeaderValue, HOST};
use http::{Request, Response, Uri, Version};
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Incoming;
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};

use crate::error::{BoxError, Error, Result};
use crate::fingerprint::Http2Settings;
use crate::transport::connector::{AlpnProtocol, EstablishedConnection};

/// Body type sent over the wire.
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

/// Request sender bound to one connection.
pub enum Exchanger {
    Http1(http1::SendRequest<RequestBody>),
    Http2(http2::SendRequest<RequestBody>),
}

impl Exchanger {
    /// Start the HTTP layer matching the negotiated protocol.
    pub async fn adapt(conn: EstablishedConnection, settings: &Http2Settings) -> Result<Self> {
        let protocol = conn.protocol();
        let io = TokioIo::new(conn.into_stream());

        match protocol {
            AlpnProtocol::Http1 => {
                let (sender, connection) = http1::handshake(io).await.map_err(Error::from_hyper)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("HTTP/1.1 connection error: {}", e);
                    }
                });
                Ok(Self::Http1(sender))
            }
            AlpnProtocol::H2 => {
                let mut builder = http2::Builder::new(TokioExecutor::new());
                builder
                    .initial_stream_window_size(settings.initial_window_size)
                    .initial_connection_window_size(settings.connection_window())
                    .max_frame_size(settings.max_frame_size)
                    .header_table_size(settings.header_table_size)
                    .max_concurrent_streams(settings.max_concurrent_streams);
                if let Some(size) = settings.max_header_list_size {
                    builder.max_header_list_size(size);
                }

                let (sender, connection) =
                    builder.handshake(io).await.map_err(Error::from_hyper)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("HTTP/2 connection error: {}", e);
                    }
                });
                Ok(Self::Http2(sender))
            }
        }
    }

    /// Send one request and wait for the response head.
    pub async fn send(&mut self, mut req: Request<RequestBody>) -> Result<Response<Incoming>> {
        match self {
            Self::Http1(sender) => {
                prepare_http1(&mut req)?;
                sender.send_request(req).await.map_err(Error::from_hyper)
            }
            Self::Http2(sender) => {
                prepare_http2(&mut req)?;
                sender.send_request(req).await.map_err(Error::from_hyper)
            }
        }
    }

    /// Wait until the connection can take another request.
    pub async fn ready(&mut self) -> Result<()> {
        match self {
            Self::Http1(sender) => sender.ready().await.map_err(Error::from_hyper),
            Self::Http2(sender) => sender.ready().await.map_err(Error::from_hyper),
        }
    }

    pub fn protocol(&self) -> AlpnProtocol {
        match self {
            Self::Http1(_) => AlpnProtocol::Http1,
            Self::Http2(_) => AlpnProtocol::H2,
        }
    }

    /// True when the connection driver has shut down.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Http1(sender) => sender.is_closed(),
            Self::Http2(sender) => sender.is_closed(),
        }
    }

    /// Another handle to the same multiplexed connection; `None` for HTTP/1.1.
    pub fn share(&self) -> Option<Self> {
        match self {
            Self::Http1(_) => None,
            Self::Http2(sender) => Some(Self::Http2(sender.clone())),
        }
    }
}

/// Rewrite to origin-form and make sure a Host header is present.
fn prepare_http1<B>(req: &mut Request<B>) -> Result<()> {
    if !req.headers().contains_key(HOST) {
        if let Some(host) = host_header(req.uri()) {
            req.headers_mut().insert(HOST, host);
        }
    }

    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let origin: Uri = path
        .parse()
        .map_err(|e| Error::invalid_request(format!("Invalid request path: {}", e)))?;
    *req.uri_mut() = origin;
    *req.version_mut() = Version::HTTP_11;
    Ok(())
}

/// HTTP/2 carries scheme and authority as pseudo-headers, so the URI must stay absolute.
fn prepare_http2<B>(req: &mut Request<B>) -> Result<()> {
    if req.uri().scheme().is_none() || req.uri().authority().is_none() {
        return Err(Error::invalid_request("HTTP/2 request requires an absolute URI"));
    }
    *req.version_mut() = Version::HTTP_2;
    Ok(())
}

fn host_header(uri: &Uri) -> Option<HeaderValue> {
    let host = uri.host()?;
    let value = match uri.port_u16() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    HeaderValue::from_str(&value).ok()
}

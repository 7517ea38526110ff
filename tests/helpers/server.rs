use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use super::connection_tracker::ConnectionTracker;
use super::tls::{generate_cert_bundle, set_alpn};

/// HTTPS server answering over HTTP/1.1 or HTTP/2.
///
/// - `/` returns `hello world`
/// - `/ua` echoes the User-Agent
/// - anything else returns `echo <path>`
///
/// Every response carries the HTTP version in `x-http-version`.
pub struct HelloServer {
    port: u16,
    ca_pem: Vec<u8>,
    tracker: ConnectionTracker,
    handle: tokio::task::JoinHandle<()>,
}

impl HelloServer {
    /// TLS server preferring h2, falling back to http/1.1.
    pub async fn start() -> Self {
        Self::start_with_alpn(&["h2", "http/1.1"]).await
    }

    /// TLS server selecting from `alpn`; an empty list declines ALPN altogether.
    pub async fn start_with_alpn(alpn: &[&str]) -> Self {
        Self::start_tls(alpn, 0).await
    }

    /// TLS server that closes each of the first `count` connections after reading the
    /// ClientHello, then serves normally.
    pub async fn start_dropping_first(count: usize) -> Self {
        Self::start_tls(&["h2", "http/1.1"], count).await
    }

    async fn start_tls(alpn: &[&str], drop_first: usize) -> Self {
        let (mut builder, ca_pem) = generate_cert_bundle();
        set_alpn(&mut builder, alpn);
        let acceptor = builder.build();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let tracker = ConnectionTracker::new();
        let accepted = tracker.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    break;
                };
                accepted.record_connection(peer);
                if accepted.connection_count() <= drop_first {
                    tokio::spawn(drop_after_hello(stream));
                    continue;
                }
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    match tokio_boring::accept(&acceptor, stream).await {
                        Ok(tls) => serve(TokioIo::new(tls)).await,
                        Err(e) => tracing::debug!("Test server handshake failed: {}", e),
                    }
                });
            }
        });

        Self {
            port,
            ca_pem,
            tracker,
            handle,
        }
    }

    /// Plain-text server (no TLS).
    pub async fn start_plain() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let tracker = ConnectionTracker::new();
        let accepted = tracker.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    break;
                };
                accepted.record_connection(peer);
                tokio::spawn(serve(TokioIo::new(stream)));
            }
        });

        Self {
            port,
            ca_pem: Vec::new(),
            tracker,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://127.0.0.1:{}{}", self.port, path)
    }

    pub fn plain_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// PEM of the self-signed server certificate.
    pub fn ca_pem(&self) -> &[u8] {
        &self.ca_pem
    }

    /// TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.tracker.connection_count()
    }
}

impl Drop for HelloServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve<I>(io: TokioIo<I>)
where
    I: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let result = auto::Builder::new(TokioExecutor::new())
        .serve_connection(io, service_fn(respond))
        .await;
    if let Err(e) = result {
        tracing::debug!("Test server connection ended: {}", e);
    }
}

async fn respond(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let body = match req.uri().path() {
        "/" => "hello world".to_string(),
        "/ua" => req
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        path => format!("echo {}", path),
    };
    let response = Response::builder()
        .header("x-http-version", format!("{:?}", req.version()))
        .body(Full::new(Bytes::from(body)))
        .unwrap();
    Ok(response)
}

/// TCP server that accepts and never answers.
///
/// The receiver resolves once the client closes its side of the first connection.
pub async fn start_stalling_server() -> (u16, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        loop {
            match tokio::time::timeout(Duration::from_secs(10), stream.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) => {
                    let _ = closed_tx.send(());
                    break;
                }
                Ok(Ok(_)) => continue,
                Err(_) => break,
            }
        }
    });

    (port, closed_rx)
}

async fn drop_after_hello(mut stream: TcpStream) {
    let mut buf = [0u8; 4096];
    let _ = stream.read(&mut buf).await;
}

/// TCP server that reads the ClientHello and then either closes (`reply` is `None`) or
/// writes `reply` in the clear. Every connection is handled the same way.
pub async fn start_scripted_server(reply: Option<&'static [u8]>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                if stream.read(&mut buf).await.is_err() {
                    return;
                }
                let Some(reply) = reply else {
                    return;
                };
                if stream.write_all(reply).await.is_err() {
                    return;
                }
                // Drain until the client hangs up so the close is a clean FIN
                while let Ok(Ok(n)) =
                    tokio::time::timeout(Duration::from_secs(10), stream.read(&mut buf)).await
                {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });

    port
}

/// TLS server offering only `h2` that reports the entries of the client's first SETTINGS
/// frame as `(identifier, value)` pairs.
pub async fn start_settings_capture_server() -> (u16, oneshot::Receiver<Vec<(u16, u32)>>) {
    let (mut builder, _) = generate_cert_bundle();
    set_alpn(&mut builder, &["h2"]);
    let acceptor = builder.build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (settings_tx, settings_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut tls = tokio_boring::accept(&acceptor, stream).await.unwrap();

        let mut preface = [0u8; 24];
        tls.read_exact(&mut preface).await.unwrap();
        assert_eq!(&preface, b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n");

        let mut header = [0u8; 9];
        tls.read_exact(&mut header).await.unwrap();
        let len = u32::from_be_bytes([0, header[0], header[1], header[2]]) as usize;
        assert_eq!(header[3], 0x4, "first frame is not SETTINGS");

        let mut payload = vec![0u8; len];
        tls.read_exact(&mut payload).await.unwrap();
        let entries = payload
            .chunks_exact(6)
            .map(|e| {
                (
                    u16::from_be_bytes([e[0], e[1]]),
                    u32::from_be_bytes([e[2], e[3], e[4], e[5]]),
                )
            })
            .collect();
        let _ = settings_tx.send(entries);

        let mut buf = [0u8; 4096];
        while let Ok(Ok(n)) =
            tokio::time::timeout(Duration::from_secs(10), tls.read(&mut buf)).await
        {
            if n == 0 {
                break;
            }
        }
    });

    (port, settings_rx)
}

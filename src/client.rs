//! Fingerprinted round tripper.
//!
//! ```rust,ignore
//! use bytes::Bytes;
//! use chameleon::RoundTripper;
//! use http_body_util::Empty;
//!
//! let rt = RoundTripper::builder("hellochrome_auto").build()?;
//! let req = http::Request::get("https://example.com/").body(Empty::<Bytes>::new())?;
//! let resp = rt.round_trip(req).await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use boring::ssl::SslConnector;
use bytes::Bytes;
use http::header::{HeaderValue, USER_AGENT};
use http::{HeaderMap, Method, Request, Response, Uri, Version};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use tower::Service;

use crate::error::{BoxError, Error, Result, TimeoutPhase};
use crate::fingerprint::{resolve, ClientHelloProfile};
use crate::pool::{ConnectionCache, PoolKey};
use crate::timeouts::{with_timeout, Deadline, Timeouts};
use crate::transport::connector::{configure_ssl, DialTarget, FingerprintedConnector, TlsOptions};
use crate::transport::exchange::{Exchanger, RequestBody};
use crate::transport::tcp::{Dialer, TcpDialer};

struct Inner {
    profile: &'static ClientHelloProfile,
    tls: Arc<TlsOptions>,
    ssl: SslConnector,
    connector: FingerprintedConnector,
    cache: Option<ConnectionCache>,
    timeouts: Timeouts,
}

/// HTTP round tripper whose TLS handshakes look like a specific browser.
///
/// Cheap to clone; clones share configuration and cache.
#[derive(Clone)]
pub struct RoundTripper {
    inner: Arc<Inner>,
}

impl RoundTripper {
    /// Create a round tripper for `profile_id`.
    ///
    /// Fails with [`Error::UnknownProfile`] for unregistered identifiers. Without a dialer,
    /// plain TCP is used; without a cache, every request dials a fresh connection.
    pub fn new(
        profile_id: &str,
        tls: TlsOptions,
        dialer: Option<Arc<dyn Dialer>>,
        cache: Option<ConnectionCache>,
    ) -> Result<Self> {
        let mut builder = Self::builder(profile_id).tls_options(tls);
        builder.dialer = dialer;
        builder.cache = cache;
        builder.build()
    }

    pub fn builder(profile_id: impl Into<String>) -> RoundTripperBuilder {
        RoundTripperBuilder::new(profile_id)
    }

    /// The resolved profile every handshake uses.
    pub fn profile(&self) -> &'static ClientHelloProfile {
        self.inner.profile
    }

    pub fn timeouts(&self) -> Timeouts {
        self.inner.timeouts
    }

    /// Send `req` and return the response with its body still streaming.
    ///
    /// A [`Deadline`] request extension bounds the whole call.
    pub async fn round_trip<B>(&self, req: Request<B>) -> Result<Response<Incoming>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        match req.extensions().get::<Deadline>().copied() {
            Some(Deadline(at)) => tokio::time::timeout_at(at, self.execute(req))
                .await
                .map_err(|_| Error::Timeout(TimeoutPhase::Deadline))?,
            None => self.execute(req).await,
        }
    }

    async fn execute<B>(&self, req: Request<B>) -> Result<Response<Incoming>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (mut parts, body) = req.into_parts();
        let target = DialTarget::from_uri(&parts.uri, self.inner.tls.clone())?;

        let user_agent = self.inner.profile.user_agent;
        if !user_agent.is_empty() && !parts.headers.contains_key(USER_AGENT) {
            parts
                .headers
                .insert(USER_AGENT, HeaderValue::from_static(user_agent));
        }

        let replay = if is_idempotent(&parts.method) && is_empty(&body) {
            Some(RequestHead {
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                version: parts.version,
                headers: parts.headers.clone(),
            })
        } else {
            None
        };

        let body: RequestBody = body.map_err(Into::into).boxed_unsync();
        match self.attempt(&target, Request::from_parts(parts, body)).await {
            Err(err) if err.is_retryable() => match replay {
                Some(head) => {
                    tracing::debug!(
                        "Redialing {}:{} after failed attempt: {}",
                        target.host,
                        target.port,
                        err
                    );
                    self.attempt(&target, head.into_request()?).await
                }
                None => Err(err),
            },
            result => result,
        }
    }

    async fn attempt(
        &self,
        target: &DialTarget,
        req: Request<RequestBody>,
    ) -> Result<Response<Incoming>> {
        let key = PoolKey::new(
            target.host.clone(),
            target.port,
            target.tls,
            self.inner.profile.name,
        );

        let mut exchanger = match &self.inner.cache {
            Some(cache) => cache.checkout(&key, || self.dial(target)).await?,
            None => self.dial(target).await?,
        };

        let result = with_timeout(
            self.inner.timeouts.exchange,
            TimeoutPhase::Exchange,
            exchanger.send(req),
        )
        .await;

        match (&result, &self.inner.cache) {
            (Ok(_), Some(cache)) if matches!(exchanger, Exchanger::Http1(_)) => {
                // Park the connection once the caller has drained the response body
                let cache = cache.clone();
                tokio::spawn(async move {
                    if exchanger.ready().await.is_ok() {
                        cache.put_h1(key, exchanger).await;
                    }
                });
            }
            (Err(err), Some(cache)) if err.is_retryable() => {
                cache.invalidate(&key).await;
            }
            _ => {}
        }

        result
    }

    async fn dial(&self, target: &DialTarget) -> Result<Exchanger> {
        let conn = self
            .inner
            .connector
            .connect_with(target, self.inner.profile, &self.inner.ssl)
            .await?;
        Exchanger::adapt(conn, &self.inner.profile.http2).await
    }
}

impl fmt::Debug for RoundTripper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundTripper")
            .field("profile", &self.inner.profile.name)
            .field("timeouts", &self.inner.timeouts)
            .field("cached", &self.inner.cache.is_some())
            .finish()
    }
}

impl<B> Service<Request<B>> for RoundTripper
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<Incoming>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Incoming>>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.round_trip(req).await })
    }
}

/// Parts needed to resend a bodiless request.
struct RequestHead {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
}

impl RequestHead {
    fn into_request(self) -> Result<Request<RequestBody>> {
        let body: RequestBody = Empty::<Bytes>::new()
            .map_err(|never| match never {})
            .boxed_unsync();
        let mut req = Request::builder()
            .method(self.method)
            .uri(self.uri)
            .version(self.version)
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *req.headers_mut() = self.headers;
        Ok(req)
    }
}

fn is_idempotent(method: &Method) -> bool {
    [
        Method::GET,
        Method::HEAD,
        Method::OPTIONS,
        Method::TRACE,
        Method::PUT,
        Method::DELETE,
    ]
    .contains(method)
}

fn is_empty<B: Body>(body: &B) -> bool {
    body.is_end_stream() || body.size_hint().exact() == Some(0)
}

/// Builder for [`RoundTripper`].
pub struct RoundTripperBuilder {
    profile_id: String,
    tls: TlsOptions,
    dialer: Option<Arc<dyn Dialer>>,
    cache: Option<ConnectionCache>,
    timeouts: Timeouts,
}

impl RoundTripperBuilder {
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            tls: TlsOptions::default(),
            dialer: None,
            cache: None,
            timeouts: Timeouts::default(),
        }
    }

    pub fn tls_options(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Trust an additional root certificate (DER or PEM).
    pub fn root_certificate(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.tls = self.tls.add_root_certificate(cert);
        self
    }

    /// Accept any server certificate.
    pub fn danger_skip_verify(mut self, skip: bool) -> Self {
        self.tls = self.tls.danger_skip_verify(skip);
        self
    }

    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    pub fn cache(mut self, cache: ConnectionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn build(self) -> Result<RoundTripper> {
        let profile = resolve(&self.profile_id)?;
        // Built once; every handshake clones its settings
        let ssl = configure_ssl(profile, &self.tls)?;

        let dialer = self
            .dialer
            .unwrap_or_else(|| Arc::new(TcpDialer::new()) as Arc<dyn Dialer>);
        tracing::debug!("RoundTripper using profile {}", profile.name);

        Ok(RoundTripper {
            inner: Arc::new(Inner {
                profile,
                tls: Arc::new(self.tls),
                ssl,
                connector: FingerprintedConnector::new(dialer, self.timeouts),
                cache: self.cache,
                timeouts: self.timeouts,
            }),
        })
    }
}

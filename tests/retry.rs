use bytes::Bytes;
use chameleon::{ConnectionCache, Error, RoundTripper};
use http_body_util::{BodyExt, Empty, Full};

mod helpers;
use helpers::init_tracing;
use helpers::server::HelloServer;

fn round_tripper(cache: Option<ConnectionCache>) -> RoundTripper {
    let mut builder = RoundTripper::builder("hellochrome_72").danger_skip_verify(true);
    if let Some(cache) = cache {
        builder = builder.cache(cache);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn test_get_redials_once_after_dropped_connection() {
    init_tracing();
    let server = HelloServer::start_dropping_first(1).await;
    let rt = round_tripper(None);

    let req = http::Request::get(server.url("/"))
        .body(Empty::<Bytes>::new())
        .unwrap();
    let resp = rt.round_trip(req).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello world");

    assert_eq!(server.connections(), 2);
}

#[tokio::test]
async fn test_get_redial_through_cache() {
    init_tracing();
    let server = HelloServer::start_dropping_first(1).await;
    let cache = ConnectionCache::new();
    let rt = round_tripper(Some(cache.clone()));

    let req = http::Request::get(server.url("/"))
        .body(Empty::<Bytes>::new())
        .unwrap();
    let resp = rt.round_trip(req).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(server.connections(), 2);
    assert_eq!(cache.stats().await.connections_established, 1);
}

#[tokio::test]
async fn test_request_with_body_is_not_redialed() {
    init_tracing();
    let server = HelloServer::start_dropping_first(1).await;
    let rt = round_tripper(None);

    let req = http::Request::post(server.url("/submit"))
        .body(Full::new(Bytes::from_static(b"payload")))
        .unwrap();
    let err = rt.round_trip(req).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "got {:?}", err);

    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_second_failure_is_surfaced() {
    init_tracing();
    let server = HelloServer::start_dropping_first(2).await;
    let rt = round_tripper(None);

    let req = http::Request::get(server.url("/"))
        .body(Empty::<Bytes>::new())
        .unwrap();
    let err = rt.round_trip(req).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "got {:?}", err);
    assert!(err.is_retryable());

    assert_eq!(server.connections(), 2);
}

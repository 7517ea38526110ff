use std::time::Duration;

use bytes::Bytes;
use chameleon::{ConnectionCache, RoundTripper};
use http_body_util::{BodyExt, Empty};

mod helpers;
use helpers::init_tracing;
use helpers::server::HelloServer;

async fn get(rt: &RoundTripper, url: String) -> String {
    let req = http::Request::get(url).body(Empty::<Bytes>::new()).unwrap();
    let resp = rt.round_trip(req).await.expect("request failed");
    assert_eq!(resp.status(), 200);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Let the background task park the drained connection.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_h1_connection_reuse() {
    init_tracing();
    let server = HelloServer::start_with_alpn(&["http/1.1"]).await;
    let cache = ConnectionCache::new();
    let rt = RoundTripper::builder("hellochrome_62")
        .danger_skip_verify(true)
        .cache(cache.clone())
        .build()
        .unwrap();

    assert_eq!(get(&rt, server.url("/")).await, "hello world");
    settle().await;
    assert_eq!(cache.stats().await.http1_idle_connections, 1);

    assert_eq!(get(&rt, server.url("/again")).await, "echo /again");
    settle().await;

    assert_eq!(server.connections(), 1);
    assert_eq!(cache.stats().await.connections_established, 1);
}

#[tokio::test]
async fn test_h1_plain_connection_reuse() {
    init_tracing();
    let server = HelloServer::start_plain().await;
    let cache = ConnectionCache::new();
    let rt = RoundTripper::builder("hellofirefox_56")
        .cache(cache.clone())
        .build()
        .unwrap();

    for _ in 0..3 {
        assert_eq!(get(&rt, server.plain_url("/")).await, "hello world");
        settle().await;
    }
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_without_cache_every_request_dials() {
    init_tracing();
    let server = HelloServer::start_with_alpn(&["http/1.1"]).await;
    let rt = RoundTripper::builder("hellochrome_62")
        .danger_skip_verify(true)
        .build()
        .unwrap();

    get(&rt, server.url("/")).await;
    get(&rt, server.url("/")).await;
    assert_eq!(server.connections(), 2);
}

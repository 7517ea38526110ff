use bytes::Bytes;
use chameleon::{ConnectionCache, RoundTripper};
use http_body_util::{BodyExt, Empty};

mod helpers;
use helpers::init_tracing;
use helpers::server::HelloServer;

async fn fetch_all(rt: &RoundTripper, server: &HelloServer, count: usize) {
    let mut tasks = Vec::with_capacity(count);
    for i in 0..count {
        let rt = rt.clone();
        let url = server.url(&format!("/req/{}", i));
        tasks.push(tokio::spawn(async move {
            let req = http::Request::get(url).body(Empty::<Bytes>::new()).unwrap();
            let resp = rt.round_trip(req).await.expect("request failed");
            assert_eq!(resp.status(), 200);
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            (i, String::from_utf8(bytes.to_vec()).unwrap())
        }));
    }

    for task in tasks {
        let (i, body) = task.await.unwrap();
        assert_eq!(body, format!("echo /req/{}", i));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_http2_requests() {
    init_tracing();
    let server = HelloServer::start().await;
    let rt = RoundTripper::builder("hellochrome_72")
        .danger_skip_verify(true)
        .build()
        .unwrap();

    fetch_all(&rt, &server, 50).await;
    assert_eq!(server.connections(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_handshakes_with_custom_root() {
    init_tracing();
    let server = HelloServer::start().await;
    // Every handshake reuses the connector and root store built once by the builder
    let rt = RoundTripper::builder("helloios_12_1")
        .root_certificate(server.ca_pem().to_vec())
        .build()
        .unwrap();

    fetch_all(&rt, &server, 20).await;
    assert_eq!(server.connections(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_handshake() {
    init_tracing();
    let server = HelloServer::start().await;
    let cache = ConnectionCache::new();
    let rt = RoundTripper::builder("hellofirefox_65")
        .danger_skip_verify(true)
        .cache(cache.clone())
        .build()
        .unwrap();

    fetch_all(&rt, &server, 50).await;

    let stats = cache.stats().await;
    assert_eq!(stats.connections_established, 1);
    assert_eq!(stats.http2_connections, 1);
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn test_cache_shared_across_round_trippers() {
    init_tracing();
    let server = HelloServer::start().await;
    let cache = ConnectionCache::new();
    let first = RoundTripper::builder("hellochrome_70")
        .danger_skip_verify(true)
        .cache(cache.clone())
        .build()
        .unwrap();
    let second = RoundTripper::builder("hellochrome_70")
        .danger_skip_verify(true)
        .cache(cache.clone())
        .build()
        .unwrap();

    fetch_all(&first, &server, 3).await;
    fetch_all(&second, &server, 3).await;
    assert_eq!(server.connections(), 1);

    // A different fingerprint never rides another profile's connection
    let other = RoundTripper::builder("helloios_12_1")
        .danger_skip_verify(true)
        .cache(cache.clone())
        .build()
        .unwrap();
    fetch_all(&other, &server, 1).await;
    assert_eq!(server.connections(), 2);
}

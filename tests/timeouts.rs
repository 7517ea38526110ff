use std::time::Duration;

use bytes::Bytes;
use chameleon::{Deadline, Error, RoundTripper, TimeoutPhase, Timeouts};
use http_body_util::Empty;

mod helpers;
use helpers::init_tracing;
use helpers::server::start_stalling_server;

#[tokio::test]
async fn test_handshake_timeout_closes_socket() {
    init_tracing();
    let (port, closed) = start_stalling_server().await;
    let rt = RoundTripper::builder("hellochrome_72")
        .timeouts(Timeouts::new().handshake(Duration::from_millis(200)))
        .build()
        .unwrap();

    let req = http::Request::get(format!("https://127.0.0.1:{}/", port))
        .body(Empty::<Bytes>::new())
        .unwrap();
    let err = rt.round_trip(req).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(TimeoutPhase::Handshake)), "got {:?}", err);
    assert!(err.is_timeout());

    tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .expect("server never saw the socket close")
        .unwrap();
}

#[tokio::test]
async fn test_request_deadline_during_handshake() {
    init_tracing();
    let (port, closed) = start_stalling_server().await;
    let rt = RoundTripper::builder("hellofirefox_auto").build().unwrap();

    let mut req = http::Request::get(format!("https://127.0.0.1:{}/", port))
        .body(Empty::<Bytes>::new())
        .unwrap();
    req.extensions_mut()
        .insert(Deadline::after(Duration::from_millis(200)));

    let err = rt.round_trip(req).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(TimeoutPhase::Deadline)), "got {:?}", err);

    tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .expect("server never saw the socket close")
        .unwrap();
}

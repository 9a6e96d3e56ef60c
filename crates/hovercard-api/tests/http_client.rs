//! Exercises `HttpProfileApi` against a one-shot local HTTP responder.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use hovercard_api::{ApiError, HttpProfileApi};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one request with the given status line and JSON body.
///
/// The join handle yields the request line the client sent.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.expect("read request");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let request = String::from_utf8_lossy(&buf).to_string();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write response");
        socket.shutdown().await.ok();
        request.lines().next().unwrap_or_default().to_owned()
    });
    (format!("http://{addr}"), handle)
}

fn client(base: &str) -> HttpProfileApi {
    HttpProfileApi::new(base, "/api/users/info", Duration::from_secs(5)).expect("build client")
}

#[tokio::test]
async fn fetches_user_and_encodes_username() {
    let (base, server) = serve_once(
        "200 OK",
        r##"{"success":true,"user":{"id":5,"roles":["admin"],"points":12,"level":{"name":"Silver","color":"#c0c0c0"}}}"##,
    )
    .await;

    let user = client(&base).user_info("ann lee").await.expect("user info");
    assert_eq!(user.id(), Some(5));
    assert_eq!(user.roles(), vec!["admin"]);
    assert_eq!(user.points(), 12);

    let request_line = server.await.expect("server task");
    assert!(
        request_line.starts_with("GET /api/users/info?username=ann+lee ")
            || request_line.starts_with("GET /api/users/info?username=ann%20lee "),
        "unexpected request line: {request_line}"
    );
}

#[tokio::test]
async fn success_false_is_rejected() {
    let (base, server) = serve_once("200 OK", r#"{"success":false,"message":"not found"}"#).await;
    let err = client(&base).user_info("ghost").await.expect_err("must fail");
    assert!(matches!(err, ApiError::Rejected(ref msg) if msg == "not found"), "{err}");
    server.await.expect("server task");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let (base, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
    let err = client(&base).user_info("alice").await.expect_err("must fail");
    assert!(matches!(err, ApiError::Status { status: 500, .. }), "{err}");
    server.await.expect("server task");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let (base, server) = serve_once("200 OK", "not json").await;
    let err = client(&base).user_info("alice").await.expect_err("must fail");
    assert!(matches!(err, ApiError::Decode(_)), "{err}");
    server.await.expect("server task");
}

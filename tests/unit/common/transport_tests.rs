use std::time::Duration;

use hyper::{Method, header};
use stonewall_caldav::common::ContentEncoding;
use stonewall_caldav::{HyperTransport, Transport, TransportRequest, TransportResponse};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::compression_tests::{ICS, encode};

/// Accept one connection, answer with `head` then `body`, and hand back the raw request.
/// With `hold` set the socket stays open that long after writing.
async fn serve_once(head: String, body: Vec<u8>, hold: Duration) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.expect("read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket.write_all(head.as_bytes()).await.expect("write head");
        socket.write_all(&body).await.expect("write body");
        tokio::time::sleep(hold).await;
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&request).to_ascii_lowercase()
    });

    (format!("http://{addr}/cal/compressed-1.ics"), server)
}

fn head(content_encoding: Option<&str>, content_length: usize) -> String {
    let encoding = content_encoding
        .map(|e| format!("Content-Encoding: {e}\r\n"))
        .unwrap_or_default();
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/calendar\r\nETag: \"v1\"\r\n{encoding}Content-Length: {content_length}\r\nConnection: close\r\n\r\n"
    )
}

async fn get(transport: &HyperTransport, url: &str) -> anyhow::Result<TransportResponse> {
    transport
        .send(TransportRequest::new(Method::GET, url), CancellationToken::new())
        .await
}

#[tokio::test]
async fn test_transport_decodes_body_and_drops_encoding_headers() {
    let transport = HyperTransport::new().expect("client builds");

    for (encoding, token) in [
        (ContentEncoding::Gzip, "gzip"),
        (ContentEncoding::Br, "br"),
        (ContentEncoding::Zstd, "zstd"),
    ] {
        let wire = encode(ICS.as_bytes(), encoding).await;
        let (url, server) = serve_once(head(Some(token), wire.len()), wire, Duration::ZERO).await;

        let response = get(&transport, &url).await.expect("exchange succeeds");
        assert!(response.is_success());
        assert_eq!(response.text(), ICS, "{token}");
        assert!(response.header(header::CONTENT_ENCODING).is_none(), "{token}");
        assert!(response.header(header::CONTENT_LENGTH).is_none(), "{token}");
        assert_eq!(response.etag().as_deref(), Some("\"v1\""));

        let request = server.await.expect("server task");
        assert!(request.contains("accept-encoding: br, zstd, gzip"), "{request}");
    }
}

#[tokio::test]
async fn test_transport_leaves_plain_bodies_alone() {
    let transport = HyperTransport::new().expect("client builds");
    let (url, server) =
        serve_once(head(None, ICS.len()), ICS.as_bytes().to_vec(), Duration::ZERO).await;

    let response = get(&transport, &url).await.expect("exchange succeeds");
    assert_eq!(response.text(), ICS);
    assert_eq!(
        response.header(header::CONTENT_LENGTH),
        Some(ICS.len().to_string().as_str())
    );
    server.await.expect("server task");
}

#[tokio::test]
async fn test_default_timeout_covers_a_stalled_body() {
    let transport = HyperTransport::new()
        .expect("client builds")
        .with_default_timeout(Duration::from_millis(200));
    let partial = ICS.as_bytes()[..20].to_vec();
    let (url, server) = serve_once(head(None, ICS.len()), partial, Duration::from_secs(5)).await;

    let err = get(&transport, &url).await.expect_err("body never completes");
    assert!(err.to_string().contains("timed out"), "{err:#}");
    server.abort();
}

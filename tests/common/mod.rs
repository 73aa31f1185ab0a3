//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Request line of a call received by a mock cluster.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
}

/// Start a programmable mock cluster on an ephemeral port and return its base URL.
///
/// `f` sees the method and path of every request and returns status and body.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> String
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request_line(&mut socket).await else {
                            return;
                        };
                        let head_only = request.method == "HEAD";
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            410 => "410 Gone",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let mut response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            status_text,
                            body.len(),
                        );
                        if !head_only {
                            response.push_str(&body);
                        }
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    format!("http://{}", addr)
}

/// Mock cluster that knows `query_ids` and reports `queued` queries on `/v1/cluster`.
#[allow(dead_code)]
pub async fn start_mock_cluster(query_ids: &'static [&'static str], queued: u32) -> String {
    start_programmable_backend(move |req| async move {
        if req.path == "/v1/cluster" {
            let body = format!(
                r#"{{"activeWorkers": 2, "queuedQueries": {}, "runningQueries": 1, "blockedQueries": 0}}"#,
                queued
            );
            return (200, body);
        }
        match req.path.strip_prefix("/v1/query/") {
            Some(id) if query_ids.contains(&id) => (200, String::new()),
            _ => (404, String::new()),
        }
    })
    .await
}

async fn read_request_line(socket: &mut tokio::net::TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut parts = head.lines().next()?.split_whitespace();
    Some(MockRequest {
        method: parts.next()?.to_string(),
        path: parts.next()?.to_string(),
    })
}

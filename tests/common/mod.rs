//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use dashboard_relay::config::RelayConfig;
use dashboard_relay::http::HttpServer;
use dashboard_relay::lifecycle::Shutdown;
use dashboard_relay::sse::{encode_frame, Frame, FrameDecoder};

/// A scripted event-stream upstream.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub connections: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}/sse", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Serve `script[n]` as the body chunks of the n-th connection.
///
/// Connections beyond the script, and empty entries, are answered with 503.
/// With `hold_open`, scripted connections stay open after their chunks
/// instead of closing.
pub async fn start_sse_upstream(script: Vec<Vec<String>>, hold_open: bool) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let script = Arc::new(script);

    let (conns, reqs) = (connections.clone(), requests.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let n = conns.fetch_add(1, Ordering::SeqCst);
            let script = script.clone();
            let reqs = reqs.clone();
            tokio::spawn(async move {
                let head = read_request_head(&mut socket).await;
                reqs.lock().unwrap().push(head);

                let Some(chunks) = script.get(n).filter(|chunks| !chunks.is_empty()) else {
                    let _ = socket
                        .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                        .await;
                    let _ = socket.shutdown().await;
                    return;
                };

                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n")
                    .await;
                for chunk in chunks {
                    if socket.write_all(chunk.as_bytes()).await.is_err() {
                        return;
                    }
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }

                if hold_open {
                    std::future::pending::<()>().await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream {
        addr,
        connections,
        requests,
    }
}

/// Wire form of a data-only frame.
pub fn frame(data: &str) -> String {
    encode_frame(&Frame::new(data))
}

/// Start a JSON backend answering each request path with `handler(path)`.
pub async fn start_json_backend<F>(handler: F) -> SocketAddr
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let head = read_request_head(&mut socket).await;
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = handler(&path);
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Test configuration: fast fixed backoff, short timeouts.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.backoff.delay_ms = 50;
    config.upstream.connect_timeout_secs = 2;
    config.upstream.request_timeout_secs = 2;
    config
}

/// Start the relay on an ephemeral port.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.token()).unwrap();
    let (_updates_tx, updates) = tokio::sync::mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Read payloads from an event-stream response until `count` arrive or the
/// stream ends.
pub async fn read_payloads(res: reqwest::Response, count: usize) -> Vec<String> {
    let mut decoder = FrameDecoder::new();
    let mut body = res.bytes_stream();
    let mut payloads = Vec::new();
    while payloads.len() < count {
        let Some(Ok(chunk)) = body.next().await else { break };
        payloads.extend(decoder.feed(&chunk).map(|frame| frame.data));
    }
    payloads
}

async fn read_request_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

//! Upstream event-stream connector.
//!
//! # Responsibilities
//! - Open one streaming GET against the upstream SSE endpoint
//! - Hand out the response body chunk by chunk, unbuffered
//! - Report connect failures distinctly from read failures and clean end
//!
//! # Design Decisions
//! - `UpstreamGuard` is the only owner of an open stream; it closes exactly once
//! - No total request timeout, only a connect timeout (the body is unbounded)

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::sse::FrameTooLarge;

/// A piece of the upstream response body.
pub type Chunk = Bytes;

/// Opening the upstream stream failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Upstream answered with a non-success status.
    #[error("upstream returned {0}")]
    Status(StatusCode),

    /// DNS, TCP or TLS failure.
    #[error("upstream connection failed: {0}")]
    Transport(String),

    /// Connection was not established within the connect timeout.
    #[error("upstream connect timed out")]
    Timeout,
}

impl ConnectError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectError::Status(_) => "status",
            ConnectError::Transport(_) => "transport",
            ConnectError::Timeout => "timeout",
        }
    }
}

impl From<reqwest::Error> for ConnectError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ConnectError::Timeout
        } else {
            ConnectError::Transport(err.to_string())
        }
    }
}

/// Reading from an open upstream stream failed.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Connection reset or body decode failure mid-stream.
    #[error("upstream read failed: {0}")]
    Transport(String),

    /// Nothing arrived within the idle-read limit.
    #[error("no upstream data for {0:?}")]
    IdleTimeout(Duration),

    #[error(transparent)]
    FrameTooLarge(#[from] FrameTooLarge),
}

impl ReadError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReadError::Transport(_) => "read",
            ReadError::IdleTimeout(_) => "idle_timeout",
            ReadError::FrameTooLarge(_) => "frame_too_large",
        }
    }
}

/// Opens upstream streams. One connector serves one relay session.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: UpstreamStream;

    async fn connect(&self, url: &Url) -> Result<Self::Stream, ConnectError>;
}

/// An open upstream response body.
#[async_trait]
pub trait UpstreamStream: Send {
    /// Next chunk, `Ok(None)` on clean end of stream.
    async fn read(&mut self) -> Result<Option<Chunk>, ReadError>;

    /// Release the connection. Must be safe to call more than once.
    fn close(&mut self);
}

/// Owns an open stream and closes it exactly once, on [`close`](Self::close)
/// or on drop, whichever comes first.
pub struct UpstreamGuard<S: UpstreamStream> {
    stream: Option<S>,
}

impl<S: UpstreamStream> UpstreamGuard<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    /// Read the next chunk. A closed guard reads as end of stream.
    pub async fn read(&mut self) -> Result<Option<Chunk>, ReadError> {
        match self.stream.as_mut() {
            Some(stream) => stream.read().await,
            None => Ok(None),
        }
    }

    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl<S: UpstreamStream> Drop for UpstreamGuard<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// reqwest-backed connector.
#[derive(Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    bearer: Option<String>,
}

impl HttpConnector {
    pub fn new(client: reqwest::Client, bearer: Option<String>) -> Self {
        Self { client, bearer }
    }

    /// Client suitable for long-lived streams: connect timeout only.
    pub fn build_client(connect_timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
    }
}

#[async_trait]
impl Connector for HttpConnector {
    type Stream = HttpStream;

    async fn connect(&self, url: &Url) -> Result<HttpStream, ConnectError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConnectError::Status(status));
        }

        Ok(HttpStream {
            body: Some(response.bytes_stream().boxed()),
        })
    }
}

/// Streaming response body from [`HttpConnector`].
pub struct HttpStream {
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
}

#[async_trait]
impl UpstreamStream for HttpStream {
    async fn read(&mut self) -> Result<Option<Chunk>, ReadError> {
        let Some(body) = self.body.as_mut() else {
            return Ok(None);
        };
        match body.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(ReadError::Transport(e.to_string())),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        // Dropping the body tears the connection down.
        self.body = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStream {
        closes: Arc<AtomicUsize>,
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl UpstreamStream for CountingStream {
        async fn read(&mut self) -> Result<Option<Chunk>, ReadError> {
            if self.chunks.is_empty() {
                return Ok(None);
            }
            Ok(Some(Bytes::from_static(self.chunks.remove(0).as_bytes())))
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_guard_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut guard = UpstreamGuard::new(CountingStream {
            closes: closes.clone(),
            chunks: vec!["data: a\n\n"],
        });

        assert_eq!(guard.read().await.unwrap().unwrap(), Bytes::from_static(b"data: a\n\n"));
        guard.close();
        guard.close();
        assert!(!guard.is_open());
        assert!(guard.read().await.unwrap().is_none());
        drop(guard);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let _guard = UpstreamGuard::new(CountingStream {
                closes: closes.clone(),
                chunks: Vec::new(),
            });
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_display() {
        let err = ConnectError::Status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "upstream returned 503 Service Unavailable");
        assert_eq!(err.kind(), "status");

        let err = ReadError::from(FrameTooLarge { buffered: 10, limit: 4 });
        assert!(err.to_string().contains("exceeds limit of 4"));
        assert_eq!(err.kind(), "frame_too_large");
    }
}

//! Relay session state machine.
//!
//! # States
//! - Connecting: opening the upstream stream
//! - Streaming: reading chunks, decoding frames, emitting downstream
//! - Backoff: upstream failed or ended, waiting before reconnecting
//! - Terminated: downstream gone, cancelled, or never configured
//!
//! # State Transitions
//! ```text
//! Connecting → Streaming: connect succeeded
//! Connecting → Backoff:   connect failed
//! Streaming  → Backoff:   end of stream, read error, idle timeout
//! Streaming  → Terminated: emit failed (downstream gone)
//! Backoff    → Connecting: delay elapsed
//! any        → Terminated: cancellation or downstream detach observed
//! ```
//!
//! The upstream is closed before leaving Streaming, so a session never holds
//! two open upstream connections.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::relay::emitter::Emitter;
use crate::relay::upstream::{ConnectError, Connector, ReadError, UpstreamGuard, UpstreamStream};
use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::timeouts::{limit_from_secs, with_idle_limit};
use crate::sse::FrameDecoder;

/// Event name used for every frame sent downstream.
pub const DOWNSTREAM_EVENT: &str = "message";

/// Per-session settings, snapshotted from config when the consumer attaches.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Upstream SSE endpoint. `None` means the relay is not configured.
    pub upstream_url: Option<String>,
    pub backoff: BackoffPolicy,
    /// Longest silence tolerated on an open upstream.
    pub idle_read_timeout: Option<Duration>,
    /// Cap on a single unterminated event.
    pub max_frame_bytes: usize,
}

impl RelaySettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            upstream_url: config.upstream.sse_url.clone(),
            backoff: config.backoff.policy(),
            idle_read_timeout: limit_from_secs(config.upstream.idle_read_timeout_secs),
            max_frame_bytes: config.relay.max_frame_bytes,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No usable upstream URL; nothing was attempted.
    Unconfigured,
    /// The consumer detached.
    DownstreamGone,
    /// The server is shutting down.
    Cancelled,
}

/// Summary returned when a session ends.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub id: Uuid,
    pub termination: Termination,
    pub connect_attempts: u32,
    pub frames_forwarded: u64,
}

enum BackoffReason {
    Connect(ConnectError),
    Read(ReadError),
    EndOfStream,
}

impl BackoffReason {
    fn label(&self) -> &'static str {
        match self {
            BackoffReason::Connect(e) => e.kind(),
            BackoffReason::Read(e) => e.kind(),
            BackoffReason::EndOfStream => "end_of_stream",
        }
    }
}

enum State<S: UpstreamStream> {
    Connecting,
    Streaming(UpstreamGuard<S>),
    Backoff(BackoffReason),
    Terminated(Termination),
}

/// Relays one upstream event stream to one downstream consumer.
pub struct RelaySession<C: Connector, E: Emitter> {
    id: Uuid,
    settings: RelaySettings,
    connector: C,
    emitter: E,
    decoder: FrameDecoder,
    cancel: CancellationToken,
    /// Consecutive failures since the last delivered frame.
    failures: u32,
    connect_attempts: u32,
    frames_forwarded: u64,
}

impl<C: Connector, E: Emitter> RelaySession<C, E> {
    pub fn new(settings: RelaySettings, connector: C, emitter: E, cancel: CancellationToken) -> Self {
        let decoder = FrameDecoder::with_max_buffer(settings.max_frame_bytes);
        Self {
            id: Uuid::new_v4(),
            settings,
            connector,
            emitter,
            decoder,
            cancel,
            failures: 0,
            connect_attempts: 0,
            frames_forwarded: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Drive the session until it terminates.
    pub async fn run(self) -> SessionReport {
        let span = tracing::info_span!("relay_session", session_id = %self.id);
        async move {
            let report = self.drive().await;
            tracing::info!(
                termination = ?report.termination,
                connect_attempts = report.connect_attempts,
                frames_forwarded = report.frames_forwarded,
                "Relay session ended"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn drive(mut self) -> SessionReport {
        let url = match self.upstream_url() {
            Some(url) => url,
            None => return self.report(Termination::Unconfigured),
        };

        let _active = metrics::ActiveSession::enter();
        let mut state = State::Connecting;
        let termination = loop {
            state = match state {
                State::Connecting => self.connect(&url).await,
                State::Streaming(upstream) => self.stream(upstream).await,
                State::Backoff(reason) => self.backoff(reason).await,
                State::Terminated(termination) => break termination,
            };
        };
        self.report(termination)
    }

    fn upstream_url(&self) -> Option<Url> {
        let Some(raw) = self.settings.upstream_url.as_deref() else {
            tracing::error!("No upstream SSE URL configured; relay session not started");
            return None;
        };
        match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!(url = %raw, error = %e, "Invalid upstream SSE URL; relay session not started");
                None
            }
        }
    }

    async fn connect(&mut self, url: &Url) -> State<C::Stream> {
        self.connect_attempts += 1;
        tracing::debug!(attempt = self.connect_attempts, url = %url, "Connecting to upstream");

        let result = tokio::select! {
            biased;
            stop = stop_signal(&self.cancel, &self.emitter) => return State::Terminated(stop),
            result = self.connector.connect(url) => result,
        };

        match result {
            Ok(stream) => {
                tracing::info!(attempt = self.connect_attempts, "Upstream stream open");
                metrics::record_connect("ok");
                self.decoder.reset();
                State::Streaming(UpstreamGuard::new(stream))
            }
            Err(e) => {
                metrics::record_connect(e.kind());
                State::Backoff(BackoffReason::Connect(e))
            }
        }
    }

    async fn stream(&mut self, mut upstream: UpstreamGuard<C::Stream>) -> State<C::Stream> {
        loop {
            let read = tokio::select! {
                biased;
                stop = stop_signal(&self.cancel, &self.emitter) => {
                    upstream.close();
                    return State::Terminated(stop);
                }
                read = with_idle_limit(self.settings.idle_read_timeout, upstream.read()) => read,
            };

            let chunk = match read {
                Ok(Ok(Some(chunk))) => chunk,
                Ok(Ok(None)) => {
                    upstream.close();
                    return State::Backoff(BackoffReason::EndOfStream);
                }
                Ok(Err(e)) => {
                    upstream.close();
                    return State::Backoff(BackoffReason::Read(e));
                }
                Err(_) => {
                    upstream.close();
                    let limit = self.settings.idle_read_timeout.unwrap_or_default();
                    return State::Backoff(BackoffReason::Read(ReadError::IdleTimeout(limit)));
                }
            };

            for frame in self.decoder.feed(&chunk) {
                let sent = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(Termination::Cancelled),
                    sent = self.emitter.emit(DOWNSTREAM_EVENT, &frame.data) => {
                        sent.map_err(|_| Termination::DownstreamGone)
                    }
                };
                if let Err(termination) = sent {
                    upstream.close();
                    return State::Terminated(termination);
                }
                self.frames_forwarded += 1;
                self.failures = 0;
                metrics::record_frame_forwarded();
            }

            if let Err(e) = self.decoder.check_capacity() {
                upstream.close();
                return State::Backoff(BackoffReason::Read(e.into()));
            }
        }
    }

    async fn backoff(&mut self, reason: BackoffReason) -> State<C::Stream> {
        self.failures = self.failures.saturating_add(1);
        let delay = self.settings.backoff.delay(self.failures);
        metrics::record_backoff(reason.label());

        match &reason {
            BackoffReason::EndOfStream => {
                tracing::info!(delay = ?delay, "Upstream stream ended, reconnecting")
            }
            BackoffReason::Connect(e) => {
                tracing::warn!(error = %e, failures = self.failures, delay = ?delay, "Upstream connect failed")
            }
            BackoffReason::Read(e) => {
                tracing::warn!(error = %e, failures = self.failures, delay = ?delay, "Upstream stream failed")
            }
        }

        tokio::select! {
            biased;
            stop = stop_signal(&self.cancel, &self.emitter) => State::Terminated(stop),
            _ = tokio::time::sleep(delay) => State::Connecting,
        }
    }

    fn report(&self, termination: Termination) -> SessionReport {
        SessionReport {
            id: self.id,
            termination,
            connect_attempts: self.connect_attempts,
            frames_forwarded: self.frames_forwarded,
        }
    }
}

/// Resolves when the session must stop regardless of upstream state.
async fn stop_signal<E: Emitter>(cancel: &CancellationToken, emitter: &E) -> Termination {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Termination::Cancelled,
        _ = emitter.closed() => Termination::DownstreamGone,
    }
}

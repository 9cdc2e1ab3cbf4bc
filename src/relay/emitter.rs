//! Downstream emitter: where relayed frames go.

use async_trait::async_trait;
use axum::response::sse::Event;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// The downstream consumer is no longer attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("downstream consumer disconnected")]
pub struct DownstreamGone;

/// Sink for relayed events, bound to a single consumer.
#[async_trait]
pub trait Emitter: Send + Sync {
    /// Deliver one event. An error means the consumer is gone for good.
    async fn emit(&mut self, event: &str, payload: &str) -> Result<(), DownstreamGone>;

    /// Resolves once the consumer has detached.
    async fn closed(&self);
}

/// Emitter feeding an axum `Sse` response through a bounded channel.
///
/// The receiving half is dropped by axum when the client disconnects, which
/// is what fails `emit` and resolves `closed`.
pub struct ChannelEmitter {
    tx: mpsc::Sender<Event>,
}

/// Create an emitter and the event stream to hand to `axum::response::Sse`.
pub fn channel(capacity: usize) -> (ChannelEmitter, ReceiverStream<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelEmitter { tx }, ReceiverStream::new(rx))
}

#[async_trait]
impl Emitter for ChannelEmitter {
    async fn emit(&mut self, event: &str, payload: &str) -> Result<(), DownstreamGone> {
        let event = Event::default().event(event).data(payload);
        self.tx.send(event).await.map_err(|_| DownstreamGone)
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

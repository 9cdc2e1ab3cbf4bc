//! Event-stream relay subsystem.
//!
//! # Data Flow
//! ```text
//! upstream SSE endpoint
//!     → upstream.rs (streaming GET, chunk reads, close-once guard)
//!     → sse::decoder (bytes → ordered frames)
//!     → session.rs (state machine: connect / stream / backoff / terminate)
//!     → emitter.rs (bounded channel into the client's SSE response)
//! ```
//!
//! # Design Decisions
//! - One session per downstream consumer, each with its own upstream
//! - No shared mutable state between sessions
//! - Upstream failures are absorbed; only the consumer leaving ends a session

pub mod emitter;
pub mod session;
pub mod upstream;

pub use emitter::{ChannelEmitter, DownstreamGone, Emitter};
pub use session::{RelaySession, RelaySettings, SessionReport, Termination};
pub use upstream::{ConnectError, Connector, HttpConnector, ReadError, UpstreamGuard, UpstreamStream};

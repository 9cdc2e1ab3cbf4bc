//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger → cancel relay sessions → stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Relay sessions are cancelled first so their SSE responses end
//!   and graceful shutdown does not wait on open streams

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

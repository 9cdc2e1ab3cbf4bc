//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Relay session upstream I/O:
//!     → timeouts.rs (idle-read limit turns a silent stall into a read error)
//!     → On failure/end: backoff.rs (delay before the next connect)
//! ```
//!
//! # Design Decisions
//! - Every upstream failure is retried; only the downstream ends a session
//! - Fixed delay by default, exponential with jitter when configured

pub mod backoff;
pub mod timeouts;

pub use backoff::BackoffPolicy;

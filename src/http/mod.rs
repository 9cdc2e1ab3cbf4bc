//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! client request
//!     → server.rs (request ID, trace, session gate, metrics)
//!     → /events      → events.rs (spawn relay session, stream SSE back)
//!     → /api/*       → loaders.rs (fetch backend, validate with schema.rs)
//!     → /login, /logout → auth.rs (session cookie)
//!     → /health
//! ```

pub mod auth;
pub mod events;
pub mod loaders;
pub mod schema;
pub mod server;

pub use server::{AppState, HttpServer, ServerError};

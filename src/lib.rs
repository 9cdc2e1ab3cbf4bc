//! Dashboard relay library: relays a backend event stream to dashboard
//! clients and serves the dashboard's data endpoints.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod sse;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{RelaySession, RelaySettings};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, overlay RELAY_* environment)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → held in an ArcSwap shared by handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<RelayConfig>
//!     → new sessions and requests see it; running sessions keep their snapshot
//! ```
//!
//! # Design Decisions
//! - Config is passed explicitly; there is no process-wide singleton
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::RelayConfig;
pub use schema::{AuthConfig, BackoffConfig, BackoffStrategy, SameSite, UpstreamConfig};

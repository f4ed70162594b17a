//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On reload signal:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → route table swap + registry service replacement
//!     → in-flight requests finish against their snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Listener bind, auth issuer, and metrics bind are fixed at startup;
//!   a reload only swaps routes and static registry services

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, GatewayConfig, HealthCheckConfig, ListenerConfig, RegistryConfig, RouteConfig,
    StaticServiceConfig, TimeoutConfig,
};
pub use watcher::ConfigWatcher;

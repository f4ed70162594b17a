//! API gateway library.
//!
//! Routes incoming HTTP requests to backend services discovered through
//! a service registry, enforcing bearer-token authentication per route.

pub mod auth;
pub mod balancer;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;

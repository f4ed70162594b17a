//! HTTP listener subsystem.
//!
//! # Data Flow
//! ```text
//! TCP accept
//!     → server.rs middleware stack
//!       (request id → trace → id propagation → request timeout)
//!     → gateway_handler → dispatch::Dispatcher
//! ```
//!
//! # Design Decisions
//! - A single catch-all route; real matching happens in the route table
//! - Background loops share one shutdown broadcast channel

pub mod request;
pub mod server;

pub use server::GatewayServer;

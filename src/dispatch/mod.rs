//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Listener request
//!     → dispatcher.rs match stage (route table lookup → 404)
//!     → authenticate stage (bearer token → 401/403)
//!     → degraded check (stale registry → 503)
//!     → select stage (round robin → 503 when empty)
//!     → forward stage (buffered body, per-attempt timeout)
//!         transport failure / timeout → one retry, different endpoint
//!         received response → relayed verbatim, passive health mark
//! ```
//!
//! # Design Decisions
//! - Error taxonomy lives in error.rs; one status code per failure class
//! - The pipeline never retries a response the upstream actually sent

pub mod dispatcher;
pub mod error;

pub use dispatcher::Dispatcher;
pub use error::GatewayError;

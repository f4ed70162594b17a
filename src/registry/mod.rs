//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! discovery backend (static config / Consul health API)
//!     → client.rs refresh (coalesced, timeout-bounded)
//!     → RegistrySnapshot (immutable, ArcSwap published)
//!     → resolve() hands healthy endpoint sets to the balancer
//!
//! Endpoint health:
//!     health monitor + passive marks
//!     → atomics on ServiceEndpoint
//!     → carried over by address across snapshot rebuilds
//! ```
//!
//! # Design Decisions
//! - Consumers read snapshots lock-free; a poll never blocks a request
//! - Backend unreachability keeps the last-known-good snapshot serving
//! - After the stale grace period the client reports degraded and the
//!   dispatcher fails fast instead of routing into the unknown

pub mod backend;
pub mod client;
pub mod endpoint;

pub use backend::{build_backend, ConsulBackend, DiscoveryBackend, DiscoveryError, StaticBackend};
pub use client::{RegistryClient, RegistrySnapshot};
pub use endpoint::{HealthState, ServiceEndpoint};

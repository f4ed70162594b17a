//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each endpoint in the registry snapshot
//!     → mark_success / mark_failure on the endpoint atomics
//!
//! Passive health checks:
//!     Forward failure observed by the dispatcher
//!     → mark_failure on the selected endpoint
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Unhealthy transition requires consecutive failures; one success restores
//! - Health state is per-endpoint, not per-service

pub mod active;

pub use active::HealthMonitor;

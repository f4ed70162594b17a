//! Load selection subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher asks for an endpoint
//!     → registry resolve (healthy snapshot)
//!     → round_robin.rs (per-service counter, fetch_add rotation)
//!     → Arc<ServiceEndpoint> or None (Unavailable)
//! ```
//!
//! # Design Decisions
//! - Per-service counters; one busy service never skews another's rotation
//! - Stateless with respect to endpoints: counters survive snapshot swaps

pub mod round_robin;

pub use round_robin::LoadSelector;

//! Observability subsystem.
//!
//! # Responsibilities
//! - Prometheus metrics exposition on a dedicated listener
//! - Recording helpers so call sites never touch macro syntax twice

pub mod metrics;

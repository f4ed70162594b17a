//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, method)
//!     → table.rs (scan compiled routes)
//!     → rule.rs (segment match + rewrite)
//!     → Return: RouteMatch or NoMatch
//!
//! Route Compilation (startup and reload):
//!     RouteConfig[]
//!     → Compile segment lists and method sets
//!     → Freeze as immutable RouteTable
//!     → ArcSwap publish; in-flight lookups keep their snapshot
//! ```
//!
//! # Design Decisions
//! - Routes compiled at build, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: longest literal prefix, then declaration order

pub mod rule;
pub mod table;

pub use rule::CompiledRoute;
pub use table::{RouteMatch, RouteTable};

//! Token validation subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → validator.rs (hash token, consult cache)
//!     → cache.rs hit  → cached Claims, no network
//!     → cache.rs miss → introspection.rs (RFC 7662 POST)
//!         active   → cache positive (expiry capped) → Claims
//!         inactive → cache negative (short TTL) → Invalid
//!         error    → Invalid (fail closed, nothing cached)
//!
//! Startup:
//!     discovery.rs resolves the introspection endpoint from the
//!     issuer's well-known document unless configured explicitly
//! ```
//!
//! # Design Decisions
//! - Raw tokens never stored; SHA-256 hashes key the cache
//! - Expired entries are misses, never cached failures
//! - Provider unreachability denies the request, it never bypasses auth

pub mod cache;
pub mod claims;
pub mod discovery;
pub mod introspection;
pub mod validator;

pub use claims::{AuthError, Claims};
pub use discovery::DiscoveryError;
pub use validator::TokenValidator;

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Assemble server → Start listener
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown.rs broadcast
//!
//! Shutdown:
//!     Broadcast received → stop accepting → drain → background loops exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

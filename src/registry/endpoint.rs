//! Service endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single backend instance of a logical service
//! - Track health state (Healthy/Unhealthy) with hysteresis counters
//! - Record the time of the last health probe

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// A single instance of a logical service.
///
/// Health state lives in atomics on the endpoint itself so it survives
/// snapshot rebuilds: the registry carries existing `Arc`s over when a
/// poll returns the same address again.
#[derive(Debug)]
pub struct ServiceEndpoint {
    /// Logical service this endpoint belongs to.
    pub service: String,
    /// The address of the endpoint.
    pub addr: SocketAddr,

    /// Current health state (0=Unknown, 1=Healthy, 2=Unhealthy).
    state: AtomicU8,
    /// Consecutive failure count.
    consecutive_failures: AtomicUsize,
    /// Unix timestamp (seconds) of the last health probe, 0 if never probed.
    last_checked: AtomicU64,
}

impl ServiceEndpoint {
    /// Create a new endpoint in the Unknown state.
    pub fn new(service: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            service: service.into(),
            addr,
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            last_checked: AtomicU64::new(0),
        }
    }

    /// Return true if the endpoint is considered healthy (Healthy or Unknown).
    ///
    /// Unknown counts as healthy so a freshly discovered endpoint receives
    /// traffic before its first probe completes.
    pub fn is_healthy(&self) -> bool {
        self.state.load(Ordering::Relaxed) != (HealthState::Unhealthy as u8)
    }

    /// Current state for logging and gauges.
    pub fn state(&self) -> HealthState {
        self.state.load(Ordering::Relaxed).into()
    }

    /// Report a successful request or probe.
    ///
    /// A single success restores an unhealthy endpoint.
    pub fn mark_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
        self.touch();
    }

    /// Report a failed request or probe.
    ///
    /// The endpoint transitions to Unhealthy after `unhealthy_threshold`
    /// consecutive failures.
    pub fn mark_failure(&self, unhealthy_threshold: u32) {
        self.touch();

        if self.state.load(Ordering::Relaxed) == (HealthState::Unhealthy as u8) {
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold as usize {
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
        }
    }

    /// Unix timestamp (seconds) of the last probe, 0 if never probed.
    pub fn last_checked(&self) -> u64 {
        self.last_checked.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.last_checked.store(now, Ordering::Relaxed);
    }
}

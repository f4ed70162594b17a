//! Round-robin endpoint selection.
//!
//! # Responsibilities
//! - Rotate through a service's healthy endpoints
//! - Keep one counter per service so services rotate independently
//!
//! # Design Decisions
//! - The counter advances exactly once per selection call, whether or
//!   not a candidate is found
//! - Selection runs over the already-filtered healthy set so every
//!   healthy endpoint gets an equal share

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::registry::{RegistryClient, ServiceEndpoint};

/// Per-service round-robin selector over registry snapshots.
pub struct LoadSelector {
    registry: Arc<RegistryClient>,
    counters: DashMap<String, AtomicUsize>,
}

impl LoadSelector {
    pub fn new(registry: Arc<RegistryClient>) -> Self {
        Self {
            registry,
            counters: DashMap::new(),
        }
    }

    /// Pick the next healthy endpoint of a service, or None when the
    /// healthy set is empty.
    pub fn select(&self, service: &str) -> Option<Arc<ServiceEndpoint>> {
        self.pick(service, self.registry.resolve(service))
    }

    /// Pick the next healthy endpoint that is not the excluded address.
    ///
    /// Backs the retry path: the second attempt must land on a different
    /// endpoint when one exists.
    pub fn select_excluding(
        &self,
        service: &str,
        excluded: SocketAddr,
    ) -> Option<Arc<ServiceEndpoint>> {
        let healthy: Vec<_> = self
            .registry
            .resolve(service)
            .into_iter()
            .filter(|ep| ep.addr != excluded)
            .collect();
        self.pick(service, healthy)
    }

    fn pick(
        &self,
        service: &str,
        healthy: Vec<Arc<ServiceEndpoint>>,
    ) -> Option<Arc<ServiceEndpoint>> {
        let counter = self
            .counters
            .entry(service.to_string())
            .or_insert_with(|| AtomicUsize::new(0));
        let tick = counter.fetch_add(1, Ordering::Relaxed);

        if healthy.is_empty() {
            return None;
        }
        Some(healthy[tick % healthy.len()].clone())
    }
}

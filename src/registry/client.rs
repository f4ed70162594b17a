//! Registry client.
//!
//! # Responsibilities
//! - Poll the discovery backend and publish endpoint snapshots
//! - Coalesce concurrent refresh calls into one in-flight poll
//! - Serve the last-known-good snapshot while the backend is unreachable
//! - Report degraded state once the snapshot exceeds the stale grace period

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{self, Instant};

use crate::config::RegistryConfig;
use crate::observability::metrics;
use crate::registry::backend::{DiscoveryBackend, DiscoveryError};
use crate::registry::endpoint::ServiceEndpoint;

/// An immutable view of every known endpoint, grouped by service.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    services: HashMap<String, Vec<Arc<ServiceEndpoint>>>,
}

impl RegistrySnapshot {
    /// All endpoints of a service, healthy or not.
    pub fn endpoints(&self, service: &str) -> &[Arc<ServiceEndpoint>] {
        self.services
            .get(service)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every endpoint in the snapshot, for the health monitor sweep.
    pub fn all_endpoints(&self) -> impl Iterator<Item = &Arc<ServiceEndpoint>> {
        self.services.values().flatten()
    }
}

/// Client over a discovery backend publishing atomic snapshots.
pub struct RegistryClient {
    backend: Arc<dyn DiscoveryBackend>,
    snapshot: ArcSwap<RegistrySnapshot>,
    /// Service names polled in remote-discovery modes.
    watched: ArcSwap<Vec<String>>,

    /// Serializes polls; late callers coalesce on the generation counter.
    refresh_gate: Mutex<()>,
    generation: AtomicU64,

    started: Instant,
    /// Milliseconds since `started` of the last successful poll.
    last_success_ms: AtomicU64,

    poll_interval: Duration,
    poll_timeout: Duration,
    stale_after: Duration,
}

impl RegistryClient {
    pub fn new(
        backend: Arc<dyn DiscoveryBackend>,
        config: &RegistryConfig,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            watched: ArcSwap::from_pointee(Vec::new()),
            refresh_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
            started: Instant::now(),
            last_success_ms: AtomicU64::new(0),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_timeout,
            stale_after: Duration::from_secs(config.stale_after_secs),
        }
    }

    /// Healthy endpoints of a service from the current snapshot.
    pub fn resolve(&self, service: &str) -> Vec<Arc<ServiceEndpoint>> {
        self.snapshot
            .load()
            .endpoints(service)
            .iter()
            .filter(|ep| ep.is_healthy())
            .cloned()
            .collect()
    }

    /// The current whole snapshot (healthy and unhealthy endpoints).
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Replace the set of services polled in remote-discovery modes.
    pub fn set_watched_services(&self, services: Vec<String>) {
        self.watched.store(Arc::new(services));
    }

    /// Forward replaced static endpoint sets to the backend after a reload.
    pub fn apply_static_services(&self, services: &[crate::config::StaticServiceConfig]) {
        self.backend.apply_static(services);
    }

    /// Poll the backend and publish a fresh snapshot.
    ///
    /// Concurrent callers coalesce: whoever holds the gate polls, and a
    /// caller that waited behind a completed poll returns without polling
    /// again.
    pub async fn refresh(&self) -> Result<(), DiscoveryError> {
        let observed = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_gate.lock().await;
        if self.generation.load(Ordering::Acquire) != observed {
            return Ok(());
        }

        let watched = self.watched.load_full();
        let result = time::timeout(self.poll_timeout, self.backend.fetch(&watched)).await;

        let fetched = match result {
            Ok(Ok(sets)) => sets,
            Ok(Err(e)) => {
                metrics::record_registry_refresh(false);
                return Err(e);
            }
            Err(_) => {
                metrics::record_registry_refresh(false);
                return Err(DiscoveryError::Timeout);
            }
        };

        self.publish(fetched);
        self.last_success_ms
            .store(self.started.elapsed().as_millis() as u64, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
        metrics::record_registry_refresh(true);
        Ok(())
    }

    /// True once the grace period since the last successful poll has passed.
    pub fn is_degraded(&self) -> bool {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let last_ms = self.last_success_ms.load(Ordering::Relaxed);
        elapsed_ms.saturating_sub(last_ms) > self.stale_after.as_millis() as u64
    }

    /// Background refresh loop with jittered spacing.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = self.poll_interval.as_secs(),
            "Registry refresh loop starting"
        );

        loop {
            let delay = jittered(self.poll_interval);
            tokio::select! {
                _ = time::sleep(delay) => {
                    if let Err(e) = self.refresh().await {
                        tracing::warn!(error = %e, "Registry refresh failed, serving last-known-good snapshot");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Registry refresh loop received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Rebuild the snapshot, carrying existing endpoints over by address
    /// so their health state survives.
    fn publish(&self, fetched: HashMap<String, Vec<std::net::SocketAddr>>) {
        let old = self.snapshot.load();
        let mut services = HashMap::with_capacity(fetched.len());

        for (name, addrs) in fetched {
            let existing = old.endpoints(&name);
            let endpoints = addrs
                .into_iter()
                .map(|addr| {
                    existing
                        .iter()
                        .find(|ep| ep.addr == addr)
                        .cloned()
                        .unwrap_or_else(|| Arc::new(ServiceEndpoint::new(name.clone(), addr)))
                })
                .collect::<Vec<_>>();
            services.insert(name, endpoints);
        }

        self.snapshot.store(Arc::new(RegistrySnapshot { services }));
    }
}

/// Poll spacing with jitter (0 to 10% of the interval) so replicas do not
/// thunder against the registry in lockstep.
fn jittered(base: Duration) -> Duration {
    use rand::Rng;

    let base_ms = base.as_millis() as u64;
    let jitter_range = base_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };
    Duration::from_millis(base_ms + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticServiceConfig;
    use crate::registry::backend::StaticBackend;
    use std::sync::atomic::AtomicUsize;

    fn static_client(addresses: Vec<&str>) -> RegistryClient {
        let backend = Arc::new(StaticBackend::new(vec![StaticServiceConfig {
            name: "orders".to_string(),
            addresses: addresses.into_iter().map(String::from).collect(),
        }]));
        let config = RegistryConfig::default();
        RegistryClient::new(backend, &config, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn refresh_publishes_snapshot() {
        let client = static_client(vec!["10.0.0.5:5000", "10.0.0.6:5000"]);
        assert!(client.resolve("orders").is_empty());

        client.refresh().await.unwrap();
        assert_eq!(client.resolve("orders").len(), 2);
        assert!(client.resolve("billing").is_empty());
    }

    #[tokio::test]
    async fn resolve_excludes_unhealthy() {
        let client = static_client(vec!["10.0.0.5:5000", "10.0.0.6:5000"]);
        client.refresh().await.unwrap();

        let snapshot = client.snapshot();
        let victim = &snapshot.endpoints("orders")[0];
        for _ in 0..3 {
            victim.mark_failure(3);
        }

        let healthy = client.resolve("orders");
        assert_eq!(healthy.len(), 1);
        assert!(healthy.iter().all(|ep| ep.addr != victim.addr));
    }

    #[tokio::test]
    async fn health_state_survives_refresh() {
        let client = static_client(vec!["10.0.0.5:5000", "10.0.0.6:5000"]);
        client.refresh().await.unwrap();

        let snapshot = client.snapshot();
        for _ in 0..3 {
            snapshot.endpoints("orders")[0].mark_failure(3);
        }

        client.refresh().await.unwrap();
        assert_eq!(client.resolve("orders").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_after_grace_period() {
        struct FailingBackend;

        #[async_trait::async_trait]
        impl DiscoveryBackend for FailingBackend {
            async fn fetch(
                &self,
                _services: &[String],
            ) -> Result<HashMap<String, Vec<std::net::SocketAddr>>, DiscoveryError> {
                Err(DiscoveryError::Timeout)
            }
        }

        let config = RegistryConfig::default();
        let client = RegistryClient::new(Arc::new(FailingBackend), &config, Duration::from_secs(5));
        assert!(!client.is_degraded());

        time::advance(Duration::from_secs(config.stale_after_secs + 1)).await;
        assert!(client.is_degraded());
    }

    #[tokio::test]
    async fn successful_refresh_clears_degraded_window() {
        let client = static_client(vec!["10.0.0.5:5000"]);
        client.refresh().await.unwrap();
        assert!(!client.is_degraded());
    }

    #[tokio::test]
    async fn waiting_caller_coalesces_on_completed_poll() {
        struct CountingBackend {
            calls: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl DiscoveryBackend for CountingBackend {
            async fn fetch(
                &self,
                _services: &[String],
            ) -> Result<HashMap<String, Vec<std::net::SocketAddr>>, DiscoveryError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(HashMap::new())
            }
        }

        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let config = RegistryConfig::default();
        let client = Arc::new(RegistryClient::new(
            backend.clone(),
            &config,
            Duration::from_secs(5),
        ));

        let a = client.clone();
        let b = client.clone();
        let (ra, rb) = tokio::join!(a.refresh(), b.refresh());
        ra.unwrap();
        rb.unwrap();

        // One caller polls; the other either coalesced or ran after, but
        // never more than one poll per generation observed.
        assert!(backend.calls.load(Ordering::SeqCst) <= 2);

        let before = backend.calls.load(Ordering::SeqCst);
        client.refresh().await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), before + 1);
    }
}

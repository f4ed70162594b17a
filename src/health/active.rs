//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every endpoint in the registry snapshot
//! - Update endpoint health state based on results

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::registry::RegistryClient;

pub struct HealthMonitor {
    registry: Arc<RegistryClient>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<RegistryClient>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every endpoint in the current snapshot once.
    ///
    /// Public so tests can drive sweeps deterministically instead of
    /// waiting out the ticker.
    pub async fn check_once(&self) {
        let snapshot = self.registry.snapshot();

        for endpoint in snapshot.all_endpoints() {
            let addr = endpoint.addr;
            let uri_string = format!("http://{}{}", addr, self.config.path);

            let request = match Request::builder()
                .method("GET")
                .uri(uri_string)
                .header("user-agent", "api-gateway-health-check")
                .body(Body::empty())
            {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!("Failed to build health check request: {}", e);
                    continue;
                }
            };

            let timeout = Duration::from_secs(self.config.timeout_secs);
            let response_future = self.client.request(request);

            let healthy = match time::timeout(timeout, response_future).await {
                Ok(Ok(response)) => {
                    let success = response.status().is_success();
                    if !success {
                        tracing::warn!(
                            addr = %addr,
                            service = %endpoint.service,
                            status = %response.status(),
                            "Health check failed: non-success status"
                        );
                    }
                    success
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        addr = %addr,
                        service = %endpoint.service,
                        error = %e,
                        "Health check failed: connection error"
                    );
                    false
                }
                Err(_) => {
                    tracing::warn!(
                        addr = %addr,
                        service = %endpoint.service,
                        "Health check failed: timeout"
                    );
                    false
                }
            };

            if healthy {
                endpoint.mark_success();
            } else {
                endpoint.mark_failure(self.config.unhealthy_threshold);
            }

            metrics::record_endpoint_health(
                &endpoint.service,
                &addr.to_string(),
                endpoint.is_healthy(),
            );
        }
    }
}

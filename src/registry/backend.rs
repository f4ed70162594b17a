//! Discovery backends.
//!
//! # Responsibilities
//! - Fetch the current endpoint set for the watched services
//! - Static mode reads fixed endpoint lists from configuration
//! - Consul mode queries the agent's health API for passing instances

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{RegistryConfig, StaticServiceConfig};

/// Error type for discovery polls.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry poll timed out")]
    Timeout,

    #[error("invalid endpoint address '{0}'")]
    InvalidAddress(String),
}

/// A source of service endpoint sets.
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Fetch the current address set for the given services.
    ///
    /// A service missing from the result has no instances right now.
    async fn fetch(
        &self,
        services: &[String],
    ) -> Result<HashMap<String, Vec<SocketAddr>>, DiscoveryError>;

    /// Replace statically configured endpoint sets after a config reload.
    ///
    /// Backends that discover endpoints remotely ignore this.
    fn apply_static(&self, _services: &[StaticServiceConfig]) {}
}

/// Fixed endpoint sets from configuration.
pub struct StaticBackend {
    services: ArcSwap<Vec<StaticServiceConfig>>,
}

impl StaticBackend {
    pub fn new(services: Vec<StaticServiceConfig>) -> Self {
        Self {
            services: ArcSwap::from_pointee(services),
        }
    }
}

#[async_trait]
impl DiscoveryBackend for StaticBackend {
    async fn fetch(
        &self,
        _services: &[String],
    ) -> Result<HashMap<String, Vec<SocketAddr>>, DiscoveryError> {
        let configured = self.services.load();
        let mut out = HashMap::with_capacity(configured.len());
        for service in configured.iter() {
            let mut addrs = Vec::with_capacity(service.addresses.len());
            for raw in &service.addresses {
                let addr = raw
                    .parse::<SocketAddr>()
                    .map_err(|_| DiscoveryError::InvalidAddress(raw.clone()))?;
                addrs.push(addr);
            }
            out.insert(service.name.clone(), addrs);
        }
        Ok(out)
    }

    fn apply_static(&self, services: &[StaticServiceConfig]) {
        self.services.store(Arc::new(services.to_vec()));
    }
}

/// Consul health API entry, trimmed to the fields the gateway reads.
#[derive(Debug, Deserialize)]
struct ConsulHealthEntry {
    #[serde(rename = "Node")]
    node: ConsulNode,
    #[serde(rename = "Service")]
    service: ConsulService,
}

#[derive(Debug, Deserialize)]
struct ConsulNode {
    #[serde(rename = "Address")]
    address: String,
}

#[derive(Debug, Deserialize)]
struct ConsulService {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
}

/// Consul agent backend listing passing instances per service.
pub struct ConsulBackend {
    base_url: String,
    http: reqwest::Client,
}

impl ConsulBackend {
    pub fn new(consul_url: &str) -> Self {
        Self {
            base_url: consul_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl DiscoveryBackend for ConsulBackend {
    async fn fetch(
        &self,
        services: &[String],
    ) -> Result<HashMap<String, Vec<SocketAddr>>, DiscoveryError> {
        let mut out = HashMap::with_capacity(services.len());
        for name in services {
            let url = format!("{}/v1/health/service/{}?passing=true", self.base_url, name);
            let entries: Vec<ConsulHealthEntry> = self
                .http
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let mut addrs = Vec::with_capacity(entries.len());
            for entry in entries {
                // Consul leaves Service.Address empty when the instance
                // shares the node address.
                let host = if entry.service.address.is_empty() {
                    &entry.node.address
                } else {
                    &entry.service.address
                };
                let raw = format!("{}:{}", host, entry.service.port);
                let addr = raw
                    .parse::<SocketAddr>()
                    .map_err(|_| DiscoveryError::InvalidAddress(raw.clone()))?;
                addrs.push(addr);
            }
            out.insert(name.clone(), addrs);
        }
        Ok(out)
    }
}

/// Create a discovery backend based on the configured mode.
///
/// The mode string is validated at config load; anything unexpected here
/// falls back to static so a running gateway never panics on reload.
pub fn build_backend(config: &RegistryConfig) -> Arc<dyn DiscoveryBackend> {
    match config.mode.as_str() {
        "consul" => Arc::new(ConsulBackend::new(&config.consul_url)),
        "static" => Arc::new(StaticBackend::new(config.services.clone())),
        other => {
            tracing::warn!(mode = %other, "Unknown registry mode, falling back to static");
            Arc::new(StaticBackend::new(config.services.clone()))
        }
    }
}

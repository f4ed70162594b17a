//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Route definitions mapping request patterns to logical services.
    pub routes: Vec<RouteConfig>,

    /// Service registry connection settings.
    pub registry: RegistryConfig,

    /// Identity provider / token validation settings.
    pub auth: AuthConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    ///
    /// Bodies are buffered up to this size so a failed forward can be
    /// replayed against a different endpoint.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Route configuration mapping a request pattern to a logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path pattern: literal segments with an optional trailing `*`
    /// wildcard segment (e.g. "/api/orders/*").
    pub pattern: String,

    /// HTTP methods this route accepts. Empty = all methods.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Logical service name resolved through the registry.
    pub service: String,

    /// Prefix that replaces the matched literal segments when the
    /// request is forwarded. Defaults to stripping the prefix.
    #[serde(default)]
    pub rewrite_prefix: String,

    /// Whether requests on this route must carry a valid bearer token.
    #[serde(default)]
    pub requires_auth: bool,

    /// Scopes the validated token must carry. Only meaningful when
    /// `requires_auth` is set.
    #[serde(default)]
    pub required_scopes: Vec<String>,
}

/// Service registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Discovery mode: "static" or "consul".
    pub mode: String,

    /// Consul agent base URL (consul mode).
    pub consul_url: String,

    /// Poll interval for the background refresh loop in seconds.
    pub poll_interval_secs: u64,

    /// Grace period after which the last-known-good snapshot is
    /// considered stale and the gateway fails fast.
    pub stale_after_secs: u64,

    /// Fixed endpoint sets (static mode).
    pub services: Vec<StaticServiceConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mode: "static".to_string(),
            consul_url: "http://127.0.0.1:8500".to_string(),
            poll_interval_secs: 15,
            stale_after_secs: 60,
            services: Vec::new(),
        }
    }
}

/// A statically configured service and its endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticServiceConfig {
    /// Logical service name.
    pub name: String,

    /// Endpoint addresses (e.g., "10.0.0.5:5000").
    pub addresses: Vec<String>,
}

/// Identity provider configuration for token validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OIDC issuer URL. The introspection endpoint is discovered from
    /// the issuer's well-known metadata document unless overridden.
    pub issuer_url: String,

    /// Explicit introspection endpoint, skipping discovery.
    pub introspection_url: Option<String>,

    /// Client id presented to the introspection endpoint.
    pub client_id: String,

    /// Client secret presented to the introspection endpoint.
    pub client_secret: String,

    /// Maximum number of cached token validations.
    pub cache_capacity: usize,

    /// Cap on how long a positive validation may be cached, even if the
    /// provider reports a longer token lifetime.
    pub max_ttl_secs: u64,

    /// How long a provider-reported-invalid token is remembered, so a
    /// replayed bad token does not hammer the provider.
    pub negative_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer_url: String::new(),
            introspection_url: None,
            client_id: String::new(),
            client_secret: String::new(),
            cache_capacity: 10_000,
            max_ttl_secs: 300,
            negative_ttl_secs: 30,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Number of consecutive failures before marking unhealthy.
    /// A single success restores an endpoint.
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 2,
            path: "/health".to_string(),
            unhealthy_threshold: 3,
        }
    }
}

/// Timeout configuration for the per-stage bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request budget enforced at the listener in seconds.
    pub request_secs: u64,

    /// Upstream forward timeout per attempt in seconds.
    pub upstream_secs: u64,

    /// Token introspection timeout in seconds.
    pub introspection_secs: u64,

    /// Registry poll timeout in seconds.
    pub registry_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
            introspection_secs: 5,
            registry_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route and status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_rejections_total` (counter): typed failures by route and reason
//! - `gateway_retries_total` (counter): forward retries by service
//! - `gateway_auth_cache_total` (counter): token cache hits and misses
//! - `gateway_registry_refresh_total` (counter): poll outcomes
//! - `gateway_endpoint_healthy` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Route name labels, never raw paths; label cardinality stays bounded
//! - Recording before init is a no-op, so tests need no exporter

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, status: StatusCode, elapsed: Duration) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.as_u16().to_string(),
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_rejection(route: &str, reason: &'static str) {
    counter!(
        "gateway_rejections_total",
        "route" => route.to_string(),
        "reason" => reason,
    )
    .increment(1);
}

pub fn record_retry(service: &str) {
    counter!("gateway_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_auth_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("gateway_auth_cache_total", "outcome" => outcome).increment(1);
}

pub fn record_registry_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("gateway_registry_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_endpoint_health(service: &str, addr: &str, healthy: bool) {
    gauge!(
        "gateway_endpoint_healthy",
        "service" => service.to_string(),
        "endpoint" => addr.to_string(),
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

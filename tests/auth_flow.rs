//! Bearer-token enforcement tests: introspection, caching, scopes, and
//! fail-closed behavior.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use api_gateway::config::GatewayConfig;
use axum::http::StatusCode;

mod common;

fn auth_config(
    bind: SocketAddr,
    introspection: SocketAddr,
    required_scopes: &[&str],
) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = bind.to_string();
    config.health_check.enabled = false;
    config.observability.metrics_enabled = false;

    config.auth.introspection_url = Some(format!("http://{introspection}/introspect"));
    config.auth.client_id = "gateway".to_string();
    config.auth.client_secret = "secret".to_string();

    let mut route = common::route_config("orders", "/api/orders/*", "orders");
    route.requires_auth = true;
    route.required_scopes = required_scopes.iter().map(|s| s.to_string()).collect();
    config.routes.push(route);
    config
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let introspection_addr: SocketAddr = "127.0.0.1:29201".parse().unwrap();
    let backend_addr: SocketAddr = "127.0.0.1:29202".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29203".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    common::start_mock_introspection(introspection_addr, "good-token", "orders:read", calls.clone())
        .await;
    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = auth_config(gateway_addr, introspection_addr, &["orders:read"]);
    config.registry.services.push(common::static_service("orders", &[backend_addr]));

    let gateway = common::start_gateway(config).await;

    let res = client()
        .get(format!("http://{}/api/orders/1", gateway.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0, "no token means no introspection call");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn invalid_token_is_rejected_and_remembered() {
    let introspection_addr: SocketAddr = "127.0.0.1:29211".parse().unwrap();
    let backend_addr: SocketAddr = "127.0.0.1:29212".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29213".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    common::start_mock_introspection(introspection_addr, "good-token", "orders:read", calls.clone())
        .await;
    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = auth_config(gateway_addr, introspection_addr, &["orders:read"]);
    config.registry.services.push(common::static_service("orders", &[backend_addr]));

    let gateway = common::start_gateway(config).await;
    let client = client();

    for _ in 0..3 {
        let res = client
            .get(format!("http://{}/api/orders/1", gateway.addr))
            .bearer_auth("bad-token")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "a rejected token should be answered from the negative cache"
    );

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn valid_token_is_accepted_and_cached() {
    let introspection_addr: SocketAddr = "127.0.0.1:29221".parse().unwrap();
    let backend_addr: SocketAddr = "127.0.0.1:29222".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29223".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    common::start_mock_introspection(introspection_addr, "good-token", "orders:read", calls.clone())
        .await;
    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = auth_config(gateway_addr, introspection_addr, &["orders:read"]);
    config.registry.services.push(common::static_service("orders", &[backend_addr]));

    let gateway = common::start_gateway(config).await;
    let client = client();

    for _ in 0..3 {
        let res = client
            .get(format!("http://{}/api/orders/1", gateway.addr))
            .bearer_auth("good-token")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "ok");
    }
    assert_eq!(
        calls.load(Ordering::SeqCst),
        1,
        "repeat validations should be served from the cache"
    );

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn insufficient_scope_is_forbidden() {
    let introspection_addr: SocketAddr = "127.0.0.1:29231".parse().unwrap();
    let backend_addr: SocketAddr = "127.0.0.1:29232".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29233".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    common::start_mock_introspection(introspection_addr, "good-token", "orders:read", calls).await;
    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = auth_config(gateway_addr, introspection_addr, &["orders:write"]);
    config.registry.services.push(common::static_service("orders", &[backend_addr]));

    let gateway = common::start_gateway(config).await;

    let res = client()
        .get(format!("http://{}/api/orders/1", gateway.addr))
        .bearer_auth("good-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn unreachable_provider_fails_closed() {
    // Nothing listens on 29241; introspection requests are refused.
    let introspection_addr: SocketAddr = "127.0.0.1:29241".parse().unwrap();
    let backend_addr: SocketAddr = "127.0.0.1:29242".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29243".parse().unwrap();

    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = auth_config(gateway_addr, introspection_addr, &["orders:read"]);
    config.registry.services.push(common::static_service("orders", &[backend_addr]));

    let gateway = common::start_gateway(config).await;

    let res = client()
        .get(format!("http://{}/api/orders/1", gateway.addr))
        .bearer_auth("good-token")
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.status(),
        StatusCode::UNAUTHORIZED,
        "provider failure must deny, never bypass"
    );

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn unprotected_route_needs_no_token() {
    let introspection_addr: SocketAddr = "127.0.0.1:29251".parse().unwrap();
    let backend_addr: SocketAddr = "127.0.0.1:29252".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29253".parse().unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    common::start_mock_introspection(introspection_addr, "good-token", "orders:read", calls.clone())
        .await;
    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = auth_config(gateway_addr, introspection_addr, &["orders:read"]);
    config.routes.push(common::route_config("public", "/public/*", "orders"));
    config.registry.services.push(common::static_service("orders", &[backend_addr]));

    let gateway = common::start_gateway(config).await;

    let res = client()
        .get(format!("http://{}/public/status", gateway.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    gateway.shutdown.trigger();
}

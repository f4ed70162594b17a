//! Shared utilities for gateway integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use api_gateway::config::{GatewayConfig, RouteConfig, StaticServiceConfig};
use api_gateway::http::GatewayServer;
use api_gateway::lifecycle::Shutdown;

/// Request head and raw bytes as seen by a mock backend.
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub raw: String,
}

fn parse_head(raw: &str) -> ReceivedRequest {
    let first_line = raw.lines().next().unwrap_or_default();
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    ReceivedRequest {
        method,
        path,
        raw: raw.to_string(),
    }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        504 => "504 Gateway Timeout",
        _ => "200 OK",
    }
}

/// Read one request, waiting for the full body when Content-Length says
/// more is coming.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 2048];

    loop {
        let Ok(Ok(n)) =
            tokio::time::timeout(Duration::from_millis(500), socket.read(&mut chunk)).await
        else {
            break;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .take_while(|line| !line.is_empty())
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}

/// Start a mock backend that always answers 200 with a fixed body.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, body: &'static str) {
    start_programmable_backend(addr, move |_req| async move { (200, body.to_string()) }).await;
}

/// Start a backend whose responses are computed per request.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(ReceivedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let f = f.clone();
            tokio::spawn(async move {
                let raw = read_request(&mut socket).await;
                let (status, body) = f(parse_head(&raw)).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });
}

/// Start a mock token introspection endpoint.
///
/// The valid token is reported active with the given scope and an
/// expiry an hour out; everything else is inactive. Calls are counted
/// so tests can observe caching.
#[allow(dead_code)]
pub async fn start_mock_introspection(
    addr: SocketAddr,
    valid_token: &'static str,
    scope: &'static str,
    calls: Arc<AtomicU32>,
) {
    start_programmable_backend(addr, move |req| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let body = req.raw.split("\r\n\r\n").nth(1).unwrap_or_default();
            let presented = body
                .split('&')
                .find_map(|pair| pair.strip_prefix("token="));

            if presented == Some(valid_token) {
                let exp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs()
                    + 3600;
                (
                    200,
                    format!(r#"{{"active":true,"sub":"user-1","scope":"{scope}","exp":{exp}}}"#),
                )
            } else {
                (200, r#"{"active":false}"#.to_string())
            }
        }
    })
    .await;
}

#[allow(dead_code)]
pub fn route_config(name: &str, pattern: &str, service: &str) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        pattern: pattern.to_string(),
        methods: Vec::new(),
        service: service.to_string(),
        rewrite_prefix: String::new(),
        requires_auth: false,
        required_scopes: Vec::new(),
    }
}

#[allow(dead_code)]
pub fn static_service(name: &str, addresses: &[SocketAddr]) -> StaticServiceConfig {
    StaticServiceConfig {
        name: name.to_string(),
        addresses: addresses.iter().map(|a| a.to_string()).collect(),
    }
}

/// A gateway running in the background with handles the test keeps.
#[allow(dead_code)]
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_tx: mpsc::UnboundedSender<GatewayConfig>,
}

/// Assemble and spawn the gateway, waiting briefly for it to come up.
#[allow(dead_code)]
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();
    let (config_tx, config_updates) = mpsc::unbounded_channel();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let server = GatewayServer::new(config).await.unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(300)).await;

    TestGateway {
        addr,
        shutdown,
        config_tx,
    }
}

//! Request pipeline.
//!
//! # Responsibilities
//! - Run every request through match, authenticate, select, forward
//! - Buffer request bodies so a failed forward can be replayed once
//! - Feed passive health signals back into the registry snapshot
//!
//! # Design Decisions
//! - Received upstream responses are relayed verbatim, never retried;
//!   only transport failures and timeouts get the one retry
//! - The retry must land on a different endpoint; with a single
//!   endpoint the first failure is final
//! - Hop-by-hop headers are stripped in both directions

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::{HeaderMap, AUTHORIZATION, HOST};
use axum::http::{request::Parts, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::auth::TokenValidator;
use crate::balancer::LoadSelector;
use crate::config::GatewayConfig;
use crate::dispatch::error::GatewayError;
use crate::observability::metrics;
use crate::registry::{RegistryClient, ServiceEndpoint};
use crate::routing::{CompiledRoute, RouteMatch, RouteTable};

/// Headers that bind to a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// How a forward attempt failed, before it is mapped to a client status.
#[derive(Debug)]
enum ForwardFailure {
    Transport(String),
    TimedOut,
}

impl From<ForwardFailure> for GatewayError {
    fn from(failure: ForwardFailure) -> Self {
        match failure {
            ForwardFailure::Transport(detail) => GatewayError::Upstream(detail),
            ForwardFailure::TimedOut => GatewayError::Timeout,
        }
    }
}

/// The request pipeline shared across all listener connections.
pub struct Dispatcher {
    routes: ArcSwap<RouteTable>,
    registry: Arc<RegistryClient>,
    selector: LoadSelector,
    validator: Option<Arc<TokenValidator>>,
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
    upstream_timeout: Duration,
    unhealthy_threshold: u32,
}

impl Dispatcher {
    pub fn new(
        routes: RouteTable,
        registry: Arc<RegistryClient>,
        validator: Option<Arc<TokenValidator>>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            routes: ArcSwap::from_pointee(routes),
            selector: LoadSelector::new(registry.clone()),
            registry,
            validator,
            client: Client::builder(TokioExecutor::new()).build_http(),
            max_body_bytes: config.listener.max_body_bytes,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
            unhealthy_threshold: config.health_check.unhealthy_threshold,
        }
    }

    /// Swap in a freshly compiled route table. In-flight requests keep
    /// the table they started with.
    pub fn apply_routes(&self, table: RouteTable) {
        self.routes.store(Arc::new(table));
    }

    pub fn route_count(&self) -> usize {
        self.routes.load().len()
    }

    /// Run one request through the full pipeline and produce the client
    /// response, including error responses.
    pub async fn handle(&self, req: Request) -> Response {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let routes = self.routes.load_full();
        let Some(matched) = routes.match_route(&path, &method) else {
            let err = GatewayError::NotFound;
            metrics::record_request("unmatched", err.status(), started.elapsed());
            metrics::record_rejection("unmatched", err.label());
            tracing::debug!(%method, path, "No route matched");
            return err.into_response();
        };

        let route_name = matched.route.name.clone();
        match self.dispatch(&matched, req).await {
            Ok(response) => {
                metrics::record_request(&route_name, response.status(), started.elapsed());
                tracing::debug!(
                    route = %route_name,
                    status = response.status().as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request forwarded"
                );
                response
            }
            Err(err) => {
                metrics::record_request(&route_name, err.status(), started.elapsed());
                metrics::record_rejection(&route_name, err.label());
                tracing::warn!(route = %route_name, error = %err, "Request rejected");
                err.into_response()
            }
        }
    }

    async fn dispatch(&self, matched: &RouteMatch, req: Request) -> Result<Response, GatewayError> {
        self.authenticate(&matched.route, req.headers()).await?;

        if self.registry.is_degraded() {
            return Err(GatewayError::RegistryDegraded);
        }

        let service = matched.route.service.as_str();
        let first = self
            .selector
            .select(service)
            .ok_or(GatewayError::Unavailable)?;

        let (parts, body) = req.into_parts();
        let bytes = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| GatewayError::BodyTooLarge)?;

        match self
            .forward(&first, &parts, &matched.upstream_path, &bytes)
            .await
        {
            Ok(response) => Ok(self.relay(&first, response)),
            Err(failure) => {
                first.mark_failure(self.unhealthy_threshold);
                self.retry(matched, &first, &parts, &bytes, failure).await
            }
        }
    }

    /// Replay the buffered request against a different endpoint. One
    /// retry only; a second failure is returned to the client.
    async fn retry(
        &self,
        matched: &RouteMatch,
        failed: &ServiceEndpoint,
        parts: &Parts,
        bytes: &Bytes,
        first_failure: ForwardFailure,
    ) -> Result<Response, GatewayError> {
        let service = matched.route.service.as_str();
        let Some(second) = self.selector.select_excluding(service, failed.addr) else {
            return Err(first_failure.into());
        };

        metrics::record_retry(service);
        tracing::warn!(
            service,
            failed = %failed.addr,
            retry = %second.addr,
            "Forward failed, retrying against a different endpoint"
        );

        match self
            .forward(&second, parts, &matched.upstream_path, bytes)
            .await
        {
            Ok(response) => Ok(self.relay(&second, response)),
            Err(failure) => {
                second.mark_failure(self.unhealthy_threshold);
                Err(failure.into())
            }
        }
    }

    /// Enforce the route's auth requirements. Any validator failure,
    /// including provider unreachability, denies the request.
    async fn authenticate(
        &self,
        route: &CompiledRoute,
        headers: &HeaderMap,
    ) -> Result<(), GatewayError> {
        if !route.requires_auth {
            return Ok(());
        }

        let token = bearer_token(headers).ok_or(GatewayError::Unauthorized)?;
        let validator = self
            .validator
            .as_ref()
            .ok_or(GatewayError::Unauthorized)?;

        let claims = validator
            .validate(token)
            .await
            .map_err(|_| GatewayError::Unauthorized)?;

        if !claims.has_scopes(&route.required_scopes) {
            return Err(GatewayError::Forbidden);
        }
        Ok(())
    }

    /// Send the buffered request to one endpoint under the per-attempt
    /// timeout.
    async fn forward(
        &self,
        endpoint: &ServiceEndpoint,
        parts: &Parts,
        upstream_path: &str,
        bytes: &Bytes,
    ) -> Result<hyper::Response<Incoming>, ForwardFailure> {
        let uri = upstream_uri(endpoint.addr, upstream_path, parts.uri.query())?;

        let mut upstream = Request::builder()
            .method(parts.method.clone())
            .uri(uri)
            .body(Body::from(bytes.clone()))
            .map_err(|e| ForwardFailure::Transport(e.to_string()))?;
        *upstream.headers_mut() = parts.headers.clone();
        scrub_headers(upstream.headers_mut());

        match tokio::time::timeout(self.upstream_timeout, self.client.request(upstream)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(ForwardFailure::Transport(err.to_string())),
            Err(_) => Err(ForwardFailure::TimedOut),
        }
    }

    /// Record the passive health signal and pass the upstream response
    /// through with connection-scoped headers removed.
    fn relay(&self, endpoint: &ServiceEndpoint, response: hyper::Response<Incoming>) -> Response {
        match response.status() {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                endpoint.mark_failure(self.unhealthy_threshold);
            }
            _ => endpoint.mark_success(),
        }

        let mut response = response.map(Body::new);
        for name in HOP_BY_HOP {
            response.headers_mut().remove(name);
        }
        response
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn scrub_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    // The client stack sets Host from the upstream URI.
    headers.remove(HOST);
}

fn upstream_uri(
    addr: SocketAddr,
    path: &str,
    query: Option<&str>,
) -> Result<Uri, ForwardFailure> {
    let target = match query {
        Some(query) => format!("http://{addr}{path}?{query}"),
        None => format!("http://{addr}{path}"),
    };
    target
        .parse()
        .map_err(|e: axum::http::uri::InvalidUri| ForwardFailure::Transport(e.to_string()))
}

//! HTTP server setup.
//!
//! # Responsibilities
//! - Wire subsystems together: routes, registry, validator, dispatcher
//! - Build the Axum router and middleware stack
//! - Run background loops (registry poll, health checks, config reload)
//! - Serve with graceful shutdown
//!
//! # Design Decisions
//! - Request ids are set before the trace layer so every log line
//!   carries one; client-supplied ids pass through
//! - Hot reload swaps the route table and static endpoint sets only;
//!   listener and auth changes need a restart

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{DiscoveryError, TokenValidator};
use crate::config::{AuthConfig, GatewayConfig};
use crate::dispatch::Dispatcher;
use crate::health::HealthMonitor;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::registry::{build_backend, RegistryClient};
use crate::routing::RouteTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// The assembled gateway: router plus the subsystems behind it.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<RegistryClient>,
}

impl GatewayServer {
    /// Assemble the gateway from configuration.
    ///
    /// The initial registry refresh is attempted but not required; a
    /// failure starts the gateway degraded and the poll loop recovers.
    pub async fn new(config: GatewayConfig) -> Result<Self, DiscoveryError> {
        let routes = RouteTable::build(&config.routes);
        tracing::info!(routes = routes.len(), "Route table compiled");

        let backend = build_backend(&config.registry);
        let registry = Arc::new(RegistryClient::new(
            backend,
            &config.registry,
            Duration::from_secs(config.timeouts.registry_secs),
        ));
        registry.set_watched_services(routes.service_names());
        if let Err(err) = registry.refresh().await {
            tracing::warn!(error = %err, "Initial registry refresh failed, starting degraded");
        }

        let validator = if auth_configured(&config.auth) {
            let validator = TokenValidator::from_config(
                &config.auth,
                Duration::from_secs(config.timeouts.introspection_secs),
            )
            .await?;
            Some(Arc::new(validator))
        } else {
            tracing::info!("No identity provider configured; protected routes will reject");
            None
        };

        let dispatcher = Arc::new(Dispatcher::new(routes, registry.clone(), validator, &config));
        let router = Self::build_router(
            &config,
            AppState {
                dispatcher: dispatcher.clone(),
            },
        );

        Ok(Self {
            router,
            config,
            dispatcher,
            registry,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                // Outermost first: the request id exists before tracing,
                // and the timeout wraps only the handler.
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// Run the server until the shutdown signal fires.
    ///
    /// Spawns the registry poll loop, the health monitor, and the reload
    /// task, all subscribed to the same shutdown channel.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        tokio::spawn(self.registry.clone().run(shutdown.resubscribe()));

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.registry.clone(), self.config.health_check.clone());
            tokio::spawn(monitor.run(shutdown.resubscribe()));
        }

        tokio::spawn(reload_loop(
            config_updates,
            self.dispatcher.clone(),
            self.registry.clone(),
            shutdown.resubscribe(),
        ));

        let mut shutdown = shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

fn auth_configured(auth: &AuthConfig) -> bool {
    !auth.issuer_url.is_empty() || auth.introspection_url.is_some()
}

async fn gateway_handler(State(state): State<AppState>, request: Request) -> Response {
    state.dispatcher.handle(request).await
}

/// Apply validated config updates until shutdown.
///
/// In-flight requests keep the table they matched against; only new
/// requests see the swapped table.
async fn reload_loop(
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<RegistryClient>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                apply_update(&config, &dispatcher, &registry).await;
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn apply_update(
    config: &GatewayConfig,
    dispatcher: &Dispatcher,
    registry: &RegistryClient,
) {
    let table = RouteTable::build(&config.routes);
    let route_count = table.len();
    registry.set_watched_services(table.service_names());
    registry.apply_static_services(&config.registry.services);
    dispatcher.apply_routes(table);

    if let Err(err) = registry.refresh().await {
        tracing::warn!(error = %err, "Registry refresh after reload failed");
    }
    tracing::info!(routes = route_count, "Configuration reloaded");
}

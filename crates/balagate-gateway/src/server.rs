//! Gateway server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::COOKIE},
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use balagate_core::Config;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::GatewayError;
use crate::auth::{
    BackendError, Gate, GateConfig, HttpBackend, IdentityProvider, OwnershipProvider,
    gate_middleware,
};
use crate::auth::{append_cookie, removal_cookie};
use crate::middleware::harden;
use crate::proxy::UpstreamProxy;
use crate::routes::RouteTable;

/// Gateway server state shared across handlers.
#[derive(Debug)]
pub struct GatewayState {
    /// The request gate.
    pub gate: Arc<Gate>,
    /// Backend client, used for logout.
    pub backend: HttpBackend,
    /// Upstream proxy.
    pub proxy: UpstreamProxy,
    /// Loaded configuration.
    pub config: Config,
    /// Process start, for the health report.
    pub started_at: Instant,
}

/// Gateway server.
#[derive(Debug)]
pub struct Gateway {
    config: Config,
    state: Arc<GatewayState>,
}

/// Builder for constructing a Gateway with its dependencies.
pub struct GatewayBuilder {
    config: Config,
    identity: Option<Arc<dyn IdentityProvider>>,
    ownership: Option<Arc<dyn OwnershipProvider>>,
    routes: RouteTable,
}

impl GatewayBuilder {
    /// Create a new builder with default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            identity: None,
            ownership: None,
            routes: RouteTable::default(),
        }
    }

    /// Set gateway configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use a custom identity provider instead of the backend.
    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Use a custom ownership provider instead of the backend.
    #[must_use]
    pub fn with_ownership(mut self, ownership: Arc<dyn OwnershipProvider>) -> Self {
        self.ownership = Some(ownership);
        self
    }

    /// Use a custom route table.
    #[must_use]
    pub const fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if the config is invalid or an HTTP client cannot be built.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        self.config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let backend = HttpBackend::new(&self.config.backend)
            .map_err(|e| GatewayError::Config(format!("Backend client init failed: {e}")))?;

        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(backend.clone()) as Arc<dyn IdentityProvider>);
        let ownership = self
            .ownership
            .unwrap_or_else(|| Arc::new(backend.clone()) as Arc<dyn OwnershipProvider>);

        let gate = Gate::new(GateConfig::from_config(&self.config), identity, ownership)
            .with_routes(self.routes);
        let proxy = UpstreamProxy::new(&self.config.gateway)?;

        let state = GatewayState {
            gate: Arc::new(gate),
            backend,
            proxy,
            config: self.config.clone(),
            started_at: Instant::now(),
        };

        Ok(Gateway {
            config: self.config,
            state: Arc::new(state),
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("config", &self.config)
            .field("custom_identity", &self.identity.is_some())
            .field("custom_ownership", &self.ownership.is_some())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a gateway talking to the configured backend.
    ///
    /// # Errors
    ///
    /// Returns error if the config is invalid.
    pub fn new(config: Config) -> Result<Self, GatewayError> {
        GatewayBuilder::new().with_config(config).build()
    }

    /// Shared state.
    #[must_use]
    pub const fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    /// Build the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the gateway server until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound or the server fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let gateway = &self.config.gateway;
        let addr: SocketAddr = format!("{}:{}", gateway.bind_address(), gateway.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Gateway listening on http://{}", addr);
        tracing::info!(
            upstream = %gateway.upstream_url,
            backend = %self.config.backend.base_url,
            "Forwarding gated traffic"
        );

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::Server(e.to_string()))?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Assemble routes, gate, proxy and response layers.
///
/// Health and `DELETE` logout are served by the gateway itself. Everything
/// else, including other methods on the logout path, passes the gate and is
/// then forwarded upstream.
pub fn router(state: Arc<GatewayState>) -> Router {
    let gated: Router = Router::new()
        .fallback(proxy_handler)
        .layer(axum::middleware::from_fn_with_state(
            state.gate.clone(),
            gate_middleware,
        ))
        .with_state(state.clone());

    let app: Router = Router::new()
        .route("/healthz", get(health_handler))
        .route(
            "/api/auth/logout",
            delete(logout_handler).fallback_service(gated.clone()),
        )
        .with_state(state)
        .fallback_service(gated);

    harden(app)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    timestamp: String,
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn logout_handler(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    let cookies = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let backend_url = &state.config.backend.base_url;

    match state.backend.logout(cookies).await {
        Ok(()) => {
            tracing::info!("Signed out");
            let mut response = Json(json!({ "message": "Signed out" })).into_response();
            append_cookie(
                response.headers_mut(),
                &removal_cookie(state.gate.config()),
            );
            response
        }
        Err(BackendError::Api { status, message }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            tracing::warn!(status = status.as_u16(), "Backend refused logout");
            (
                status,
                Json(json!({
                    "error": "Sign-out failed",
                    "status": status.as_u16(),
                    "details": message,
                })),
            )
                .into_response()
        }
        Err(BackendError::Timeout(_)) => {
            tracing::warn!(%backend_url, "Logout timed out");
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": format!("Timed out connecting to {backend_url}") })),
            )
                .into_response()
        }
        Err(BackendError::Network(e)) if e.is_connect() => {
            tracing::warn!(%backend_url, error = %e, "Logout backend unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": format!("Could not connect to {backend_url}") })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Logout failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn proxy_handler(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    match state.proxy.forward(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

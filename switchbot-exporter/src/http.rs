//! HTTP server for the metrics, discovery and reload endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use switchbot_client::DeviceClient;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::cache::DeviceLabelCache;
use crate::discovery::discover;
use crate::metrics::{self, CONTENT_TYPE};
use crate::reload::ReloadHandle;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    client: Arc<dyn DeviceClient>,
    cache: Arc<DeviceLabelCache>,
    reload: ReloadHandle,
}

impl AppState {
    pub fn new(
        client: Arc<dyn DeviceClient>,
        cache: Arc<DeviceLabelCache>,
        reload: ReloadHandle,
    ) -> Self {
        Self {
            client,
            cache,
            reload,
        }
    }
}

/// Query parameters of `/metrics`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MetricsParams {
    /// Device id to scrape. Absent or empty means every device.
    pub target: Option<String>,
}

impl MetricsParams {
    /// Pick parameters out of raw query pairs. The first `target` wins and
    /// unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let target = pairs
            .into_iter()
            .find(|(key, _)| key == "target")
            .map(|(_, value)| value);
        Self { target }
    }

    /// The target to scrape, or `None` for every device.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }
}

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/discover", get(discover_handler))
        .route("/-/reload", any(reload_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = MetricsParams::from_pairs(pairs);
    let target = params.target();

    let targets = match metrics::resolve_targets(state.client.as_ref(), target).await {
        Ok(targets) => targets,
        Err(e) => {
            error!(error = %e, "Failed to list devices for scrape");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to list devices: {}", e),
            )
                .into_response();
        }
    };

    let snapshot = metrics::collect(state.client.as_ref(), &state.cache, &targets).await;

    match snapshot.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Handler for the /discover endpoint.
async fn discover_handler(State(state): State<AppState>) -> Response {
    match state.client.list_devices().await {
        Ok(list) => (StatusCode::OK, Json(discover(&list.devices))).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to discover devices");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to discover devices: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for the /-/reload endpoint.
async fn reload_handler(State(state): State<AppState>, method: Method) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            format!("This endpoint requires a {} request.\n", Method::POST),
        )
            .into_response();
    }

    match state.reload.reload().await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to reload config: {}", e),
        )
            .into_response(),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    state: AppState,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(state: AppState, listen_addr: SocketAddr) -> Self {
        Self { state, listen_addr }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

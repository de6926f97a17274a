//! HTTP server for EcoScan.

use crate::capture::CameraDevice;
use crate::error::{AppError, SettingsError};
use crate::llm::{provider, HostedOracle, Oracle};
use crate::routes::{self, ApiError};
use crate::settings::Settings;
use crate::workflow::ScanWorkflow;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::CONTENT_TYPE;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Application state shared across handlers.
pub struct AppState {
    pub oracle: Arc<dyn Oracle>,
    /// The single scan pipeline this process serves.
    pub workflow: ScanWorkflow,
    /// Provider summary for `GET /providers`; `Null` when built without settings.
    pub provider_config: serde_json::Value,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(oracle: Arc<dyn Oracle>, camera: Arc<dyn CameraDevice>) -> Self {
        Self {
            workflow: ScanWorkflow::new(Arc::clone(&oracle), camera),
            oracle,
            provider_config: serde_json::Value::Null,
            start_time: Instant::now(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let oracle: Arc<dyn Oracle> = Arc::new(HostedOracle::from_settings(settings)?);
        let camera = settings.camera_device()?;
        log::info!("[CAPTURE] Camera backend: {}", camera.name());

        let mut state = Self::new(oracle, camera);
        state.provider_config = provider::provider_config(settings);
        Ok(state)
    }
}

/// Build the full router with CORS, body limit and request logging.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(routes::oracle_routes())
        .merge(routes::scan_routes())
        .merge(routes::health_routes())
        .with_state(Arc::new(state))
        .layer(middleware::from_fn(log_request))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::map_response(json_error_body))
        .layer(CorsLayer::permissive())
}

/// Run the HTTP server until Ctrl-C.
pub async fn run(settings: Settings) -> Result<(), AppError> {
    let state = AppState::from_settings(&settings)?;
    let app = router(state, settings.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    log::info!("[HTTP] Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("[HTTP] Server stopped");
    Ok(())
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "[HTTP] {} {} -> {} in {}ms",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    response
}

/// Error responses produced outside the handlers (body limit, extractor
/// rejections) carry plain text. Rewrap them as `{"error": ...}`.
async fn json_error_body(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let text = match axum::body::to_bytes(response.into_body(), 4096).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        text
    };
    ApiError::new(status, message).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[HTTP] Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("[HTTP] Shutdown requested");
}

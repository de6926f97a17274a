//! API routes.
//!
//! - `/classify`, `/ideate`: stateless oracle calls
//! - `/scan/*`: drive the single scan workflow; every call answers with a snapshot
//! - `/health`, `/providers`: status

use crate::capture;
use crate::error::{ClassificationError, DecodeError, IdeationError, WorkflowError};
use crate::llm::{ClassificationResult, IdeaList};
use crate::server::AppState;
use crate::workflow::ScanSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Request bodies and errors
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub photo_data_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeateRequest {
    pub component_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub is_correct: bool,
}

/// Error response: `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl ToString) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<DecodeError> for ApiError {
    fn from(e: DecodeError) -> Self {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e)
    }
}

impl From<ClassificationError> for ApiError {
    fn from(e: ClassificationError) -> Self {
        ApiError::new(StatusCode::BAD_GATEWAY, e)
    }
}

impl From<IdeationError> for ApiError {
    fn from(e: IdeationError) -> Self {
        match e {
            IdeationError::EmptyComponentType => ApiError::new(StatusCode::BAD_REQUEST, e),
            IdeationError::Oracle(_) => ApiError::new(StatusCode::BAD_GATEWAY, e),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        let status = match &e {
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::FeedbackAlreadySubmitted
            | WorkflowError::Superseded => StatusCode::CONFLICT,
            WorkflowError::Device(_) => StatusCode::SERVICE_UNAVAILABLE,
            WorkflowError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::Classification(_) => StatusCode::BAD_GATEWAY,
            WorkflowError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e)
    }
}

// ============================================================================
// Oracle Routes
// ============================================================================

pub fn oracle_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/classify", post(classify))
        .route("/ideate", post(ideate))
}

async fn classify(
    State(state): State<AppStateArc>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let image = capture::ingest_data_uri(&req.photo_data_uri)?;
    let result = state.oracle.classify(&image).await?;
    Ok(Json(result))
}

async fn ideate(
    State(state): State<AppStateArc>,
    Json(req): Json<IdeateRequest>,
) -> Result<Json<IdeaList>, ApiError> {
    let ideas = state.oracle.generate_ideas(&req.component_type).await?;
    Ok(Json(ideas))
}

// ============================================================================
// Scan Routes
// ============================================================================

pub fn scan_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/scan", get(scan_snapshot))
        .route("/scan/camera/start", post(start_camera))
        .route("/scan/camera/capture", post(capture_frame))
        .route("/scan/camera/cancel", post(cancel_camera))
        .route("/scan/upload", post(upload))
        .route("/scan/reset", post(reset))
        .route("/scan/feedback", post(feedback))
}

async fn scan_snapshot(State(state): State<AppStateArc>) -> Json<ScanSnapshot> {
    Json(state.workflow.snapshot().await)
}

async fn start_camera(State(state): State<AppStateArc>) -> Result<Json<ScanSnapshot>, ApiError> {
    state.workflow.start_camera().await?;
    Ok(Json(state.workflow.snapshot().await))
}

async fn capture_frame(State(state): State<AppStateArc>) -> Result<Json<ScanSnapshot>, ApiError> {
    state.workflow.capture().await?;
    Ok(Json(state.workflow.snapshot().await))
}

async fn cancel_camera(State(state): State<AppStateArc>) -> Result<Json<ScanSnapshot>, ApiError> {
    state.workflow.cancel().await?;
    Ok(Json(state.workflow.snapshot().await))
}

async fn upload(
    State(state): State<AppStateArc>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ScanSnapshot>, ApiError> {
    state.workflow.upload_data_uri(&req.photo_data_uri).await?;
    Ok(Json(state.workflow.snapshot().await))
}

async fn reset(State(state): State<AppStateArc>) -> Result<Json<ScanSnapshot>, ApiError> {
    state.workflow.reset().await?;
    Ok(Json(state.workflow.snapshot().await))
}

async fn feedback(
    State(state): State<AppStateArc>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<ScanSnapshot>, ApiError> {
    state.workflow.submit_feedback(req.is_correct).await?;
    Ok(Json(state.workflow.snapshot().await))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/health", get(health))
        .route("/providers", get(providers))
}

async fn health(State(state): State<AppStateArc>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.start_time.elapsed().as_secs(),
        "scanState": state.workflow.state().await,
    }))
}

async fn providers(State(state): State<AppStateArc>) -> Json<serde_json::Value> {
    Json(state.provider_config.clone())
}

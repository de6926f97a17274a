//! Error types for every failure the scan pipeline can surface.
//!
//! Each stage has its own enum so callers can tell a denied camera from an
//! unreadable upload from a failed oracle call. The workflow converts all of
//! them into user-visible notices; the HTTP layer maps them to status codes.

use crate::workflow::ScanState;
use thiserror::Error;

// ── Capture ─────────────────────────────────────────────────────────

/// Camera could not be opened or read.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("no camera device available: {0}")]
    Unavailable(String),

    #[error("camera stream is not active")]
    StreamClosed,

    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// Uploaded bytes are not a usable image.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image payload is empty")]
    Empty,

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),
}

// ── Oracle ──────────────────────────────────────────────────────────

/// Why a single oracle call failed. Shared by both oracle operations.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no API key configured for provider '{0}'")]
    MissingApiKey(&'static str),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned no text content")]
    EmptyResponse,

    #[error("malformed JSON from model: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid model payload: {0}")]
    Invalid(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OracleError::Timeout
        } else {
            OracleError::Transport(e.to_string())
        }
    }
}

/// `classify` failed: transport, timeout, or a payload that did not validate.
#[derive(Debug, Error)]
#[error("classification failed: {0}")]
pub struct ClassificationError(#[from] pub OracleError);

/// `generate_ideas` failed.
#[derive(Debug, Error)]
pub enum IdeationError {
    #[error("component type is empty")]
    EmptyComponentType,

    #[error("idea generation failed: {0}")]
    Oracle(#[from] OracleError),
}

// ── Workflow ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: ScanState,
        action: &'static str,
    },

    #[error("feedback was already submitted for this result")]
    FeedbackAlreadySubmitted,

    #[error("scan was reset before classification finished")]
    Superseded,

    #[error("classification task stopped: {0}")]
    Interrupted(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

// ── Application shell ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("camera backend '{0}' is not compiled in (enable the `screen-camera` feature)")]
    CameraUnsupported(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Settings(#[from] SettingsError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

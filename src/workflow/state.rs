//! Scan states, user-visible notices, and the serializable snapshot.

use crate::capture::{CapturedImage, ImageSource};
use crate::llm::{ClassificationResult, ConfidenceBand, Disposition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    #[default]
    Idle,
    CameraActive,
    Loading,
    Results,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ScanState::Idle => "idle",
            ScanState::CameraActive => "camera active",
            ScanState::Loading => "loading",
            ScanState::Results => "showing results",
        })
    }
}

/// Thumbs up / thumbs down on a classification. Logged, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackMark {
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A toast-style notification for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn error(title: &str, description: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn camera_error() -> Self {
        Self::error(
            "Camera Error",
            "Could not access the camera. Please check permissions and try again.",
        )
    }

    pub fn unreadable_image() -> Self {
        Self::error(
            "Unreadable Image",
            "The selected file could not be read as an image.",
        )
    }

    pub fn classification_failed() -> Self {
        Self::error(
            "Classification Failed",
            "Failed to classify the component. Please try again.",
        )
    }

    pub fn ideation_failed() -> Self {
        Self::error("Idea Generation Failed", "Could not generate upcycling ideas.")
    }

    pub fn feedback_submitted() -> Self {
        Self {
            level: NoticeLevel::Info,
            title: "Feedback Submitted".to_string(),
            description: "Thank you for helping us improve our AI!".to_string(),
        }
    }
}

/// Image metadata without the bytes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub source: ImageSource,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    pub fingerprint: String,
}

impl From<&CapturedImage> for ImageSummary {
    fn from(image: &CapturedImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            source: image.source(),
            mime_type: image.mime_type(),
            width,
            height,
            bytes: image.bytes().len(),
            fingerprint: image.fingerprint(),
        }
    }
}

/// Classification plus the derived views the results card shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    #[serde(flatten)]
    pub classification: ClassificationResult,
    pub confidence_band: ConfidenceBand,
    pub needs_verification: bool,
    pub disposition: Disposition,
}

impl From<&ClassificationResult> for ResultView {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            classification: result.clone(),
            confidence_band: result.confidence_band(),
            needs_verification: result.needs_verification(),
            disposition: result.disposition(),
        }
    }
}

/// Point-in-time view of the workflow, as served by `GET /scan`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSnapshot {
    pub state: ScanState,
    pub generation: u64,
    pub camera_active: bool,
    pub image: Option<ImageSummary>,
    pub result: Option<ResultView>,
    pub ideas: Vec<String>,
    pub ideas_loading: bool,
    pub feedback: Option<FeedbackMark>,
    pub notices: Vec<Notice>,
}

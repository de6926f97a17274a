//! Shared fakes for workflow and route tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ecoscan_lib::capture::{CameraDevice, CapturedImage, FrameSource};
use ecoscan_lib::error::{ClassificationError, DeviceError, IdeationError, OracleError};
use ecoscan_lib::llm::{ClassificationResult, IdeaList, Oracle};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn capacitor() -> ClassificationResult {
    ClassificationResult {
        component_type: "Capacitor".to_string(),
        recyclable: true,
        hazard_flag: false,
        confidence_score: 0.92,
    }
}

pub fn battery() -> ClassificationResult {
    ClassificationResult {
        component_type: "Lithium Battery".to_string(),
        recyclable: false,
        hazard_flag: true,
        confidence_score: 0.81,
    }
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, image::Rgb([30, 120, 60])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn png_data_uri() -> String {
    use base64::Engine;
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes())
    )
}

// ── Oracle ──────────────────────────────────────────────────────────

/// Scripted oracle with optional gates that hold a call until released.
pub struct FakeOracle {
    classification: Option<ClassificationResult>,
    ideas: Option<Vec<String>>,
    classify_gate: Option<Arc<Notify>>,
    ideas_gate: Option<Arc<Notify>>,
    pub classify_calls: AtomicUsize,
    pub ideate_calls: AtomicUsize,
    pub last_component: Mutex<Option<String>>,
}

impl FakeOracle {
    pub fn recognizing(result: ClassificationResult) -> Self {
        Self {
            classification: Some(result),
            ideas: Some(vec!["Make jewelry".to_string(), "Build a coil".to_string()]),
            classify_gate: None,
            ideas_gate: None,
            classify_calls: AtomicUsize::new(0),
            ideate_calls: AtomicUsize::new(0),
            last_component: Mutex::new(None),
        }
    }

    /// Every classify call times out.
    pub fn failing() -> Self {
        Self {
            classification: None,
            ..Self::recognizing(capacitor())
        }
    }

    pub fn with_ideas(mut self, ideas: &[&str]) -> Self {
        self.ideas = Some(ideas.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn failing_ideas(mut self) -> Self {
        self.ideas = None;
        self
    }

    pub fn gate_classify(mut self, gate: Arc<Notify>) -> Self {
        self.classify_gate = Some(gate);
        self
    }

    pub fn gate_ideas(mut self, gate: Arc<Notify>) -> Self {
        self.ideas_gate = Some(gate);
        self
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn ideate_count(&self) -> usize {
        self.ideate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for FakeOracle {
    async fn classify(
        &self,
        _image: &CapturedImage,
    ) -> Result<ClassificationResult, ClassificationError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.classify_gate {
            gate.notified().await;
        }
        self.classification
            .clone()
            .ok_or(ClassificationError(OracleError::Timeout))
    }

    async fn generate_ideas(&self, component_type: &str) -> Result<IdeaList, IdeationError> {
        self.ideate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_component.lock().unwrap() = Some(component_type.to_string());
        if let Some(gate) = &self.ideas_gate {
            gate.notified().await;
        }
        match &self.ideas {
            Some(ideas) => Ok(IdeaList {
                ideas: ideas.clone(),
            }),
            None => Err(IdeationError::Oracle(OracleError::Status {
                status: 503,
                body: "overloaded".to_string(),
            })),
        }
    }
}

// ── Camera ──────────────────────────────────────────────────────────

/// Counts opens and releases so tests can check the stream is never leaked.
#[derive(Default)]
pub struct FakeCamera {
    pub deny: bool,
    pub opens: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::default()
        }
    }

    pub fn open_streams(&self) -> usize {
        self.opens.load(Ordering::SeqCst) - self.releases.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    releases: Arc<AtomicUsize>,
}

impl FrameSource for FakeStream {
    fn grab(&mut self) -> Result<DynamicImage, DeviceError> {
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            16,
            12,
            image::Rgb([200, 180, 40]),
        )))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl CameraDevice for FakeCamera {
    fn name(&self) -> &str {
        "fake"
    }

    fn open(&self) -> Result<Box<dyn FrameSource>, DeviceError> {
        if self.deny {
            return Err(DeviceError::PermissionDenied("denied by test".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            releases: Arc::clone(&self.releases),
        }))
    }
}

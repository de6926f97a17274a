//! Scan workflow: the capture → classify → ideate state machine.
//!
//! States: Idle → CameraActive → Loading → Results, with reset
//! (Results → Idle) and cancel (CameraActive → Idle) as the only backward
//! edges. Loading has no user exit; it resolves to Results or back to Idle.
//!
//! The workflow exclusively owns the camera handle and every piece of
//! per-scan data. The session lock is never held across an oracle call.
//! Classification runs on its own task, so Loading resolves even if the
//! caller that started it goes away.
//! Ideation runs as a spawned task tagged with the generation it was started
//! for; anything it returns after a reset is dropped.

mod state;

pub use state::{
    FeedbackMark, ImageSummary, Notice, NoticeLevel, ResultView, ScanSnapshot, ScanState,
};

use crate::capture::{self, CameraDevice, CameraHandle, CapturedImage};
use crate::error::{ClassificationError, DecodeError, DeviceError, WorkflowError};
use crate::llm::{ClassificationResult, Oracle};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Oldest notices are dropped beyond this.
const MAX_NOTICES: usize = 20;

#[derive(Default)]
struct Session {
    state: ScanState,
    /// Bumped whenever the current scan's data is discarded.
    generation: u64,
    camera: Option<CameraHandle>,
    image: Option<CapturedImage>,
    result: Option<ClassificationResult>,
    ideas: Vec<String>,
    ideas_loading: bool,
    ideation: Option<JoinHandle<()>>,
    feedback: Option<FeedbackMark>,
    notices: Vec<Notice>,
}

impl Session {
    fn require(&self, expected: ScanState, action: &'static str) -> Result<(), WorkflowError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn release_camera(&mut self) {
        if let Some(mut handle) = self.camera.take() {
            capture::stop_camera(&mut handle);
        }
    }

    /// Drop everything belonging to the current scan and start a new generation.
    fn discard_scan(&mut self) {
        if let Some(task) = self.ideation.take() {
            task.abort();
        }
        self.image = None;
        self.result = None;
        self.ideas.clear();
        self.ideas_loading = false;
        self.feedback = None;
        self.generation += 1;
    }

    fn notify(&mut self, notice: Notice) {
        if self.notices.len() >= MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(notice);
    }

    fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            state: self.state,
            generation: self.generation,
            camera_active: self.camera.as_ref().is_some_and(CameraHandle::is_active),
            image: self.image.as_ref().map(ImageSummary::from),
            result: self.result.as_ref().map(ResultView::from),
            ideas: self.ideas.clone(),
            ideas_loading: self.ideas_loading,
            feedback: self.feedback,
            notices: self.notices.clone(),
        }
    }
}

/// One user's scan pipeline. Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct ScanWorkflow {
    session: Arc<Mutex<Session>>,
    oracle: Arc<dyn Oracle>,
    camera: Arc<dyn CameraDevice>,
}

impl ScanWorkflow {
    pub fn new(oracle: Arc<dyn Oracle>, camera: Arc<dyn CameraDevice>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::default())),
            oracle,
            camera,
        }
    }

    pub async fn state(&self) -> ScanState {
        self.session.lock().await.state
    }

    pub async fn snapshot(&self) -> ScanSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Drain pending notices.
    pub async fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.session.lock().await.notices)
    }

    // ── Transitions ─────────────────────────────────────────────────

    /// Idle → CameraActive. On failure the workflow stays Idle with a notice.
    pub async fn start_camera(&self) -> Result<(), WorkflowError> {
        let mut session = self.session.lock().await;
        session.require(ScanState::Idle, "start the camera")?;

        // Never hold two streams at once.
        session.release_camera();

        let camera = Arc::clone(&self.camera);
        match off_worker(move || capture::start_camera(camera.as_ref())).await {
            Ok(handle) => {
                session.camera = Some(handle);
                session.state = ScanState::CameraActive;
                log::info!("[SCAN] Idle -> CameraActive");
                Ok(())
            }
            Err(e) => {
                log::warn!("[SCAN] Camera start failed: {}", e);
                session.notify(Notice::camera_error());
                Err(e.into())
            }
        }
    }

    /// CameraActive → Loading → Results | Idle.
    ///
    /// Grabs a frame, releases the camera, then waits for classification.
    pub async fn capture(&self) -> Result<ClassificationResult, WorkflowError> {
        let (image, generation) = {
            let mut session = self.session.lock().await;
            session.require(ScanState::CameraActive, "capture")?;

            let frame = match session.camera.take() {
                Some(mut handle) => {
                    off_worker(move || {
                        let frame = capture::capture_frame(&mut handle);
                        capture::stop_camera(&mut handle);
                        frame
                    })
                    .await
                }
                None => Err(DeviceError::StreamClosed),
            };

            match frame {
                Ok(image) => {
                    let generation = Self::begin_loading(&mut session, image.clone());
                    (image, generation)
                }
                Err(e) => {
                    log::warn!("[SCAN] Frame capture failed: {}", e);
                    session.state = ScanState::Idle;
                    session.notify(Notice::camera_error());
                    return Err(e.into());
                }
            }
        };
        self.settle_loading(image, generation).await
    }

    /// Idle → Loading → Results | Idle, from raw uploaded bytes.
    pub async fn upload(&self, bytes: Vec<u8>) -> Result<ClassificationResult, WorkflowError> {
        self.ingest(|| capture::ingest_file(bytes)).await
    }

    /// Idle → Loading → Results | Idle, from a base64 data URI.
    pub async fn upload_data_uri(&self, uri: &str) -> Result<ClassificationResult, WorkflowError> {
        self.ingest(|| capture::ingest_data_uri(uri)).await
    }

    /// CameraActive → Idle. Releases the camera; nothing was captured yet.
    pub async fn cancel(&self) -> Result<(), WorkflowError> {
        let mut session = self.session.lock().await;
        session.require(ScanState::CameraActive, "cancel")?;
        session.release_camera();
        session.state = ScanState::Idle;
        log::info!("[SCAN] CameraActive -> Idle (cancelled)");
        Ok(())
    }

    /// Results → Idle. Releases image, result, ideas and feedback.
    ///
    /// A reset while already Idle is a no-op.
    pub async fn reset(&self) -> Result<(), WorkflowError> {
        let mut session = self.session.lock().await;
        match session.state {
            ScanState::Idle => Ok(()),
            ScanState::Results => {
                session.release_camera();
                session.discard_scan();
                session.state = ScanState::Idle;
                log::info!("[SCAN] Results -> Idle (generation {})", session.generation);
                Ok(())
            }
            state => Err(WorkflowError::InvalidTransition {
                state,
                action: "reset",
            }),
        }
    }

    /// Record thumbs up/down once per Results visit.
    pub async fn submit_feedback(&self, is_correct: bool) -> Result<(), WorkflowError> {
        let mut session = self.session.lock().await;
        session.require(ScanState::Results, "submit feedback")?;
        if session.feedback.is_some() {
            return Err(WorkflowError::FeedbackAlreadySubmitted);
        }
        session.feedback = Some(FeedbackMark { is_correct });
        session.notify(Notice::feedback_submitted());
        log::info!(
            "[SCAN] Feedback received: classification was {}",
            if is_correct { "correct" } else { "incorrect" }
        );
        Ok(())
    }

    /// Wait for an in-flight ideation call, if any, to settle.
    pub async fn ideas_settled(&self) {
        let task = self.session.lock().await.ideation.take();
        if let Some(task) = task {
            // An aborted task resolves with a JoinError; nothing to report.
            let _ = task.await;
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn ingest<F>(&self, ingest: F) -> Result<ClassificationResult, WorkflowError>
    where
        F: FnOnce() -> Result<CapturedImage, DecodeError>,
    {
        let (image, generation) = {
            let mut session = self.session.lock().await;
            session.require(ScanState::Idle, "upload")?;
            let image = match ingest() {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("[SCAN] Upload rejected: {}", e);
                    session.notify(Notice::unreadable_image());
                    return Err(e.into());
                }
            };
            let generation = Self::begin_loading(&mut session, image.clone());
            (image, generation)
        };
        self.settle_loading(image, generation).await
    }

    /// Enter Loading with a fresh generation holding only `image`.
    fn begin_loading(session: &mut Session, image: CapturedImage) -> u64 {
        session.discard_scan();
        log::info!(
            "[SCAN] {:?} -> Loading ({:?} image {}, generation {})",
            session.state,
            image.source(),
            &image.fingerprint()[..12],
            session.generation
        );
        session.image = Some(image);
        session.state = ScanState::Loading;
        session.generation
    }

    /// Run classification on its own task so Loading always resolves, even
    /// when the caller stops waiting.
    async fn settle_loading(
        &self,
        image: CapturedImage,
        generation: u64,
    ) -> Result<ClassificationResult, WorkflowError> {
        let flow = self.clone();
        let task = tokio::spawn(async move { flow.classify(image, generation).await });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("[SCAN] Classification task failed: {}", e);
                let mut session = self.session.lock().await;
                if session.generation == generation && session.state == ScanState::Loading {
                    session.image = None;
                    session.state = ScanState::Idle;
                    session.notify(Notice::classification_failed());
                }
                Err(WorkflowError::Interrupted(e.to_string()))
            }
        }
    }

    async fn classify(
        &self,
        image: CapturedImage,
        generation: u64,
    ) -> Result<ClassificationResult, WorkflowError> {
        let start = Instant::now();
        let outcome = match self.oracle.classify(&image).await {
            Ok(result) => result.validate().map(|()| result).map_err(ClassificationError),
            Err(e) => Err(e),
        };

        let mut session = self.session.lock().await;
        if session.generation != generation {
            log::warn!("[SCAN] Dropping classification for stale generation {}", generation);
            return Err(WorkflowError::Superseded);
        }

        match outcome {
            Ok(result) => {
                session.result = Some(result.clone());
                session.state = ScanState::Results;
                log::info!(
                    "[SCAN] Loading -> Results in {}ms: {} ({:?})",
                    start.elapsed().as_millis(),
                    result.component_type,
                    result.disposition()
                );
                if result.recyclable {
                    session.ideas_loading = true;
                    session.ideation =
                        Some(self.spawn_ideation(result.component_type.clone(), generation));
                }
                Ok(result)
            }
            Err(e) => {
                log::warn!("[SCAN] Loading -> Idle: {}", e);
                session.image = None;
                session.state = ScanState::Idle;
                session.notify(Notice::classification_failed());
                Err(e.into())
            }
        }
    }

    fn spawn_ideation(&self, component_type: String, generation: u64) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let oracle = Arc::clone(&self.oracle);
        tokio::spawn(async move {
            let outcome = oracle.generate_ideas(&component_type).await;

            let mut session = session.lock().await;
            if session.generation != generation || session.state != ScanState::Results {
                log::info!(
                    "[SCAN] Discarding ideas for '{}' from stale generation {}",
                    component_type,
                    generation
                );
                return;
            }
            session.ideas_loading = false;
            match outcome {
                Ok(list) => {
                    log::info!("[SCAN] {} ideas ready for '{}'", list.ideas.len(), component_type);
                    session.ideas = list.ideas;
                }
                Err(e) => {
                    log::warn!("[SCAN] Ideation failed for '{}': {}", component_type, e);
                    session.ideas.clear();
                    session.notify(Notice::ideation_failed());
                }
            }
        })
    }
}

/// Camera work touches files, screens and encoders; keep it off the async workers.
async fn off_worker<T, F>(work: F) -> Result<T, DeviceError>
where
    F: FnOnce() -> Result<T, DeviceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DeviceError::Capture(format!("camera task failed: {}", e)))?
}

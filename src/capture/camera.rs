//! Camera devices and the scoped stream handle.
//!
//! A `CameraDevice` opens a `FrameSource`; the resulting `CameraHandle` is the
//! only owner of that stream and releases it on `stop()` or on drop,
//! whichever comes first.

use super::CapturedImage;
use crate::error::DeviceError;
use image::DynamicImage;
use std::path::PathBuf;
use std::time::Instant;

/// A live video stream that can be sampled for still frames.
pub trait FrameSource: Send {
    /// Grab the current frame.
    fn grab(&mut self) -> Result<DynamicImage, DeviceError>;

    /// Free the underlying device. Called exactly once per stream.
    fn release(&mut self) {}
}

/// A physical or virtual camera.
pub trait CameraDevice: Send + Sync {
    fn name(&self) -> &str;

    fn open(&self) -> Result<Box<dyn FrameSource>, DeviceError>;
}

/// Exclusively-owned handle to an open camera stream.
pub struct CameraHandle {
    device: String,
    stream: Option<Box<dyn FrameSource>>,
    opened_at: Instant,
}

impl CameraHandle {
    pub(crate) fn open(device: &dyn CameraDevice) -> Result<Self, DeviceError> {
        let stream = device.open()?;
        Ok(Self {
            device: device.name().to_string(),
            stream: Some(stream),
            opened_at: Instant::now(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn capture_frame(&mut self) -> Result<CapturedImage, DeviceError> {
        let stream = self.stream.as_mut().ok_or(DeviceError::StreamClosed)?;
        let start = Instant::now();
        let frame = stream.grab()?;
        let image = CapturedImage::from_frame(&frame)?;
        log::info!(
            "[CAPTURE] Frame {}x{} captured from '{}' in {}ms ({} bytes)",
            frame.width(),
            frame.height(),
            self.device,
            start.elapsed().as_millis(),
            image.bytes().len()
        );
        Ok(image)
    }

    /// Idempotent: only the first call reaches the device.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            log::info!(
                "[CAPTURE] Camera '{}' released after {}ms",
                self.device,
                self.opened_at.elapsed().as_millis()
            );
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Backends ────────────────────────────────────────────────────────

/// No camera configured. Every open fails.
pub struct NoCamera;

impl CameraDevice for NoCamera {
    fn name(&self) -> &str {
        "none"
    }

    fn open(&self) -> Result<Box<dyn FrameSource>, DeviceError> {
        Err(DeviceError::Unavailable(
            "no camera configured (set ECOSCAN_CAMERA)".into(),
        ))
    }
}

/// Virtual camera that serves one image file as every frame.
///
/// The file is read when the stream opens, so swapping it between scans
/// changes what the next scan sees.
pub struct StillCamera {
    path: PathBuf,
    name: String,
}

impl StillCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("still:{}", path.display());
        Self { path, name }
    }
}

impl CameraDevice for StillCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn FrameSource>, DeviceError> {
        let bytes = std::fs::read(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                DeviceError::PermissionDenied(format!("{}: {}", self.path.display(), e))
            }
            _ => DeviceError::Unavailable(format!("{}: {}", self.path.display(), e)),
        })?;
        let frame = image::load_from_memory(&bytes)
            .map_err(|e| DeviceError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        Ok(Box::new(StillStream { frame }))
    }
}

struct StillStream {
    frame: DynamicImage,
}

impl FrameSource for StillStream {
    fn grab(&mut self) -> Result<DynamicImage, DeviceError> {
        Ok(self.frame.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingStream {
        released: Arc<AtomicUsize>,
    }

    impl FrameSource for CountingStream {
        fn grab(&mut self) -> Result<DynamicImage, DeviceError> {
            Ok(DynamicImage::new_rgb8(4, 4))
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingCamera {
        released: Arc<AtomicUsize>,
    }

    impl CameraDevice for CountingCamera {
        fn name(&self) -> &str {
            "counting"
        }

        fn open(&self) -> Result<Box<dyn FrameSource>, DeviceError> {
            Ok(Box::new(CountingStream {
                released: Arc::clone(&self.released),
            }))
        }
    }

    #[test]
    fn stop_twice_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let camera = CountingCamera { released: Arc::clone(&released) };
        let mut handle = CameraHandle::open(&camera).unwrap();

        handle.stop();
        handle.stop();

        assert!(!handle.is_active());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_stream() {
        let released = Arc::new(AtomicUsize::new(0));
        let camera = CountingCamera { released: Arc::clone(&released) };
        {
            let _handle = CameraHandle::open(&camera).unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capture_does_not_stop_stream() {
        let released = Arc::new(AtomicUsize::new(0));
        let camera = CountingCamera { released: Arc::clone(&released) };
        let mut handle = CameraHandle::open(&camera).unwrap();

        handle.capture_frame().unwrap();

        assert!(handle.is_active());
        assert_eq!(released.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn capture_after_stop_fails() {
        let released = Arc::new(AtomicUsize::new(0));
        let camera = CountingCamera { released };
        let mut handle = CameraHandle::open(&camera).unwrap();
        handle.stop();
        assert!(matches!(handle.capture_frame(), Err(DeviceError::StreamClosed)));
    }

    #[test]
    fn no_camera_is_unavailable() {
        assert!(matches!(NoCamera.open(), Err(DeviceError::Unavailable(_))));
    }

    #[test]
    fn still_camera_missing_file_is_unavailable() {
        let camera = StillCamera::new("/nonexistent/ecoscan-frame.png");
        assert!(matches!(camera.open(), Err(DeviceError::Unavailable(_))));
    }
}

//! Primary monitor as a virtual camera, via xcap.

use super::camera::{CameraDevice, FrameSource};
use crate::error::DeviceError;
use image::DynamicImage;

pub struct ScreenCamera;

impl CameraDevice for ScreenCamera {
    fn name(&self) -> &str {
        "screen"
    }

    fn open(&self) -> Result<Box<dyn FrameSource>, DeviceError> {
        let monitors = xcap::Monitor::all().map_err(|e| DeviceError::Unavailable(e.to_string()))?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .ok_or_else(|| DeviceError::Unavailable("no primary monitor".into()))?;
        Ok(Box::new(MonitorStream { monitor }))
    }
}

struct MonitorStream {
    monitor: xcap::Monitor,
}

impl FrameSource for MonitorStream {
    fn grab(&mut self) -> Result<DynamicImage, DeviceError> {
        let rgba = self
            .monitor
            .capture_image()
            .map_err(|e| DeviceError::Capture(e.to_string()))?;
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

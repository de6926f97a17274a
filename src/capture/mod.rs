//! Capture domain: public API.
//!
//! Turns either a camera frame or an uploaded file into a single
//! `CapturedImage`, the only input the oracle ever sees.
//! External code should only use the functions exported here.

mod camera;
#[cfg(feature = "screen-camera")]
mod screen;

pub use camera::{CameraDevice, CameraHandle, FrameSource, NoCamera, StillCamera};
#[cfg(feature = "screen-camera")]
pub use screen::ScreenCamera;

use crate::error::{DecodeError, DeviceError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Cursor;

/// Formats both hosted providers accept as-is. Anything else is re-encoded
/// to PNG on ingest.
const PASSTHROUGH_FORMATS: [ImageFormat; 3] =
    [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

/// Where a captured image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageSource {
    Camera,
    Upload,
}

/// An encoded still image held for the duration of one scan.
#[derive(Clone)]
pub struct CapturedImage {
    bytes: Vec<u8>,
    mime_type: &'static str,
    source: ImageSource,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("mime_type", &self.mime_type)
            .field("source", &self.source)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl CapturedImage {
    /// Encode a live video frame as JPEG.
    pub(crate) fn from_frame(frame: &DynamicImage) -> Result<Self, DeviceError> {
        // JPEG has no alpha channel; camera frames often arrive as RGBA.
        let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
        let mut bytes = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .map_err(|e| DeviceError::Capture(format!("JPEG encode failed: {}", e)))?;
        Ok(Self {
            bytes,
            mime_type: "image/jpeg",
            source: ImageSource::Camera,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Self-describing `data:<mime>;base64,<payload>` form.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// SHA-256 of the encoded bytes, for logs and snapshots.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

// ── Camera lifecycle ────────────────────────────────────────────────

/// Open the device and hand back an exclusively-owned stream handle.
pub fn start_camera(device: &dyn CameraDevice) -> Result<CameraHandle, DeviceError> {
    let start = std::time::Instant::now();
    let handle = CameraHandle::open(device)?;
    log::info!(
        "[CAPTURE] Camera '{}' started in {}ms",
        device.name(),
        start.elapsed().as_millis()
    );
    Ok(handle)
}

/// Snapshot the current frame. The stream keeps running.
pub fn capture_frame(handle: &mut CameraHandle) -> Result<CapturedImage, DeviceError> {
    handle.capture_frame()
}

/// Release the device. Safe to call any number of times.
pub fn stop_camera(handle: &mut CameraHandle) {
    handle.stop();
}

// ── Upload ingestion ────────────────────────────────────────────────

/// Validate that `bytes` decode as an image and wrap them.
///
/// JPEG, PNG and WebP are kept byte-for-byte; other decodable formats
/// (GIF, BMP, TIFF, ...) are re-encoded to PNG.
pub fn ingest_file(bytes: Vec<u8>) -> Result<CapturedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());

    if PASSTHROUGH_FORMATS.contains(&format) {
        log::info!(
            "[CAPTURE] Ingested {:?} upload: {}x{} ({} bytes)",
            format,
            width,
            height,
            bytes.len()
        );
        return Ok(CapturedImage {
            bytes,
            mime_type: format.to_mime_type(),
            source: ImageSource::Upload,
            width,
            height,
        });
    }

    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    log::info!(
        "[CAPTURE] Re-encoded {:?} upload to PNG: {}x{} ({} -> {} bytes)",
        format,
        width,
        height,
        bytes.len(),
        png.len()
    );
    Ok(CapturedImage {
        bytes: png,
        mime_type: "image/png",
        source: ImageSource::Upload,
        width,
        height,
    })
}

/// Ingest an upload given as `data:<mime>;base64,<payload>`.
pub fn ingest_data_uri(uri: &str) -> Result<CapturedImage, DecodeError> {
    let (declared, bytes) = parse_data_uri(uri)?;
    let image = ingest_file(bytes)?;
    if declared != image.mime_type() {
        log::debug!(
            "[CAPTURE] Data URI declared {} but content is {}",
            declared,
            image.mime_type()
        );
    }
    Ok(image)
}

/// Split a base64 data URI into its declared MIME type and decoded bytes.
pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>), DecodeError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| DecodeError::InvalidDataUri("missing 'data:' prefix".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| DecodeError::InvalidDataUri("missing ',' separator".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| DecodeError::InvalidDataUri("payload is not base64-encoded".into()))?;
    if mime.is_empty() {
        return Err(DecodeError::InvalidDataUri("missing MIME type".into()));
    }
    if payload.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = STANDARD.decode(payload.trim())?;
    Ok((mime.to_ascii_lowercase(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }

    fn sample_png() -> Vec<u8> {
        let img = ImageBuffer::from_fn(6, 4, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 128]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    #[test]
    fn png_upload_is_kept_verbatim() {
        let png = sample_png();
        let image = ingest_file(png.clone()).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.source(), ImageSource::Upload);
        assert_eq!(image.dimensions(), (6, 4));
        assert_eq!(image.bytes(), png.as_slice());
    }

    #[test]
    fn bmp_upload_is_reencoded_to_png() {
        let bmp = encode(DynamicImage::new_rgb8(3, 3), ImageFormat::Bmp);
        let image = ingest_file(bmp).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.dimensions(), (3, 3));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = ingest_file(b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(matches!(ingest_file(Vec::new()), Err(DecodeError::Empty)));
    }

    #[test]
    fn data_uri_survives_ingest() {
        let image = ingest_file(sample_png()).unwrap();
        let uri = image.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        let again = ingest_data_uri(&uri).unwrap();
        assert_eq!(again.fingerprint(), image.fingerprint());
    }

    #[test]
    fn data_uri_without_base64_marker_is_rejected() {
        let err = parse_data_uri("data:image/png,abcd").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDataUri(_)));
    }

    #[test]
    fn data_uri_with_bad_base64_is_rejected() {
        let err = parse_data_uri("data:image/png;base64,@@@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn plain_base64_without_prefix_is_rejected() {
        let err = parse_data_uri("iVBORw0KGgo=").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDataUri(_)));
    }

    #[test]
    fn rgba_frame_encodes_as_jpeg() {
        let frame = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(5, 5, Rgba([10, 20, 30, 255])));
        let image = CapturedImage::from_frame(&frame).unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        assert_eq!(image.source(), ImageSource::Camera);
        assert_eq!(image::guess_format(image.bytes()).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let image = ingest_file(sample_png()).unwrap();
        let fp = image.fingerprint();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

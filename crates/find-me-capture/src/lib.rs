#![warn(missing_docs)]
//! # find-me-capture
//!
//! ## Purpose
//! Bridges a camera device into still image files for the target slot or the
//! gallery.
//!
//! ## Responsibilities
//! - Define backend-agnostic camera traits ([`CameraDevice`],
//!   [`CameraStream`]).
//! - Own at most one open stream at a time ([`CaptureBridge`]).
//! - Freeze one frame into a timestamped JPEG [`ImageFile`].
//! - Provide a deterministic synthetic camera for tests.
//!
//! ## Data flow
//! `open(mode, on_capture)` acquires the front camera -> `live_frame` feeds the
//! preview -> `capture` encodes the current frame, hands a [`CapturedPhoto`] to
//! the callback and closes.
//!
//! ## Ownership and lifetimes
//! The open stream lives inside the bridge. Its release runs from `Drop`, so
//! cancellation, capture, failed capture and bridge teardown all stop the
//! hardware.
//!
//! ## Error model
//! Permission and availability failures leave the bridge closed and return a
//! [`CaptureError`] whose [`CaptureError::user_notice`] is shown as an alert.
//!
//! ## Security and privacy notes
//! Frames are held in memory only; nothing is written to disk.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use find_me_core::ImageFile;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

/// JPEG quality for captured stills.
pub const CAPTURE_JPEG_QUALITY: u8 = 90;

/// Media type of captured stills.
pub const CAPTURE_MEDIA_TYPE: &str = "image/jpeg";

/// Which camera to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Front-facing (selfie) camera.
    User,
    /// Rear camera.
    Environment,
}

/// Which slot a capture feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Replace the target image.
    Target,
    /// Append to the gallery.
    Gallery,
}

/// One RGB frame from a camera stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Packed RGB8 pixels, row-major.
    pub rgb: Vec<u8>,
}

impl StillFrame {
    /// Creates a validated frame.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidFrame`] when `rgb` is not exactly
    /// `width * height * 3` bytes or the frame is empty.
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .ok_or_else(|| CaptureError::InvalidFrame("frame dimensions overflow".to_string()))?;
        if expected == 0 || rgb.len() != expected {
            return Err(CaptureError::InvalidFrame(format!(
                "expected {expected} bytes, got {}",
                rgb.len()
            )));
        }
        Ok(Self { width, height, rgb })
    }

    /// Encodes the frame as JPEG.
    ///
    /// # Errors
    /// Returns [`CaptureError::Encode`] when the encoder fails.
    pub fn to_jpeg(&self) -> Result<Vec<u8>, CaptureError> {
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, CAPTURE_JPEG_QUALITY)
            .encode(
                &self.rgb,
                self.width,
                self.height,
                image::ColorType::Rgb8.into(),
            )
            .map_err(|error| CaptureError::Encode(error.to_string()))?;
        Ok(jpeg)
    }
}

/// An open camera stream. Implementations release hardware in `stop`.
pub trait CameraStream: Send {
    /// Reads the current frame.
    ///
    /// # Errors
    /// Returns [`CaptureError::Device`] when the stream failed.
    fn read_frame(&mut self) -> Result<StillFrame, CaptureError>;

    /// Releases the hardware. Called exactly once by the bridge.
    fn stop(&mut self);
}

/// A camera provider.
pub trait CameraDevice: Send + Sync {
    /// Requests exclusive access to a camera.
    ///
    /// # Errors
    /// Returns [`CaptureError::PermissionDenied`] or
    /// [`CaptureError::Unavailable`] when access is not granted.
    fn open_stream(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// A captured still routed by the mode the bridge was opened with.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    /// Slot this photo feeds.
    pub mode: CaptureMode,
    /// Encoded still image.
    pub file: ImageFile,
}

type CaptureCallback = Box<dyn FnOnce(CapturedPhoto) + Send>;

struct ActiveStream {
    stream: Box<dyn CameraStream>,
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.stream.stop();
        info!("camera released");
    }
}

struct OpenCapture {
    mode: CaptureMode,
    on_capture: CaptureCallback,
    stream: ActiveStream,
}

/// Owns the camera while the capture modal is open.
pub struct CaptureBridge {
    device: Arc<dyn CameraDevice>,
    open: Option<OpenCapture>,
}

impl CaptureBridge {
    /// Creates a closed bridge over `device`.
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self { device, open: None }
    }

    /// Opens the front camera for `mode`.
    ///
    /// Any previously open stream is released first.
    ///
    /// # Errors
    /// Propagates device failures; the bridge stays closed.
    pub fn open<F>(&mut self, mode: CaptureMode, on_capture: F) -> Result<(), CaptureError>
    where
        F: FnOnce(CapturedPhoto) + Send + 'static,
    {
        self.close();

        let stream = self.device.open_stream(Facing::User).map_err(|error| {
            warn!(%error, ?mode, "camera open failed");
            error
        })?;
        info!(?mode, "camera opened");
        self.open = Some(OpenCapture {
            mode,
            on_capture: Box::new(on_capture),
            stream: ActiveStream { stream },
        });
        Ok(())
    }

    /// Returns `true` while a stream is held.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Returns the mode of the open session.
    pub fn mode(&self) -> Option<CaptureMode> {
        self.open.as_ref().map(|open| open.mode)
    }

    /// Reads the current frame for live display.
    ///
    /// # Errors
    /// Returns [`CaptureError::NotOpen`] when closed, or the stream error.
    pub fn live_frame(&mut self) -> Result<StillFrame, CaptureError> {
        let open = self.open.as_mut().ok_or(CaptureError::NotOpen)?;
        open.stream.stream.read_frame()
    }

    /// Freezes the current frame, passes it to the callback and closes.
    ///
    /// The camera is released whether or not the capture succeeds.
    ///
    /// # Errors
    /// Returns [`CaptureError::NotOpen`] when closed, or the read/encode error.
    pub fn capture(&mut self) -> Result<(), CaptureError> {
        let mut open = self.open.take().ok_or(CaptureError::NotOpen)?;
        let frame = open.stream.stream.read_frame();
        let OpenCapture {
            mode,
            on_capture,
            stream,
        } = open;
        drop(stream);

        let frame = frame?;
        let file = ImageFile::new(capture_file_name(), CAPTURE_MEDIA_TYPE, frame.to_jpeg()?);
        info!(?mode, file = %file.name, bytes = file.len(), "still captured");
        on_capture(CapturedPhoto { mode, file });
        Ok(())
    }

    /// Releases the camera without capturing.
    pub fn close(&mut self) {
        if let Some(open) = self.open.take() {
            info!(mode = ?open.mode, "capture closed");
        }
    }
}

impl Drop for CaptureBridge {
    fn drop(&mut self) {
        self.close();
    }
}

/// Returns `capture-<RFC3339 UTC>.jpeg` for the current instant.
pub fn capture_file_name() -> String {
    let stamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string());
    format!("capture-{stamp}.jpeg")
}

/// Deterministic camera for tests and demos.
///
/// Counts open streams so tests can assert the hardware was released.
#[derive(Debug)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    deny: bool,
    live_streams: Arc<AtomicUsize>,
    sequence: Arc<AtomicU64>,
}

impl SyntheticCamera {
    /// Creates a camera producing `width x height` frames.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            deny: false,
            live_streams: Arc::new(AtomicUsize::new(0)),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a camera that always refuses permission.
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new(2, 2)
        }
    }

    /// Returns the number of streams opened and not yet stopped.
    pub fn live_streams(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl CameraDevice for SyntheticCamera {
    fn open_stream(&self, _facing: Facing) -> Result<Box<dyn CameraStream>, CaptureError> {
        if self.deny {
            return Err(CaptureError::PermissionDenied);
        }
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            width: self.width,
            height: self.height,
            live_streams: Arc::clone(&self.live_streams),
            sequence: Arc::clone(&self.sequence),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    live_streams: Arc<AtomicUsize>,
    sequence: Arc<AtomicU64>,
    stopped: bool,
}

impl CameraStream for SyntheticStream {
    fn read_frame(&mut self) -> Result<StillFrame, CaptureError> {
        if self.stopped {
            return Err(CaptureError::Device("stream already stopped".to_string()));
        }
        let byte = (self.sequence.fetch_add(1, Ordering::SeqCst) % 255) as u8;
        let len = (self.width as usize) * (self.height as usize) * 3;
        StillFrame::new(self.width, self.height, vec![byte; len])
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Camera for hosts without a capture backend. Every open fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCamera;

impl CameraDevice for UnavailableCamera {
    fn open_stream(&self, _facing: Facing) -> Result<Box<dyn CameraStream>, CaptureError> {
        Err(CaptureError::Unavailable(
            "no camera backend is available on this host".to_string(),
        ))
    }
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// User or platform refused camera access.
    #[error("camera permission denied")]
    PermissionDenied,
    /// No usable camera.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// Operation needs an open bridge.
    #[error("camera is not open")]
    NotOpen,
    /// Stream failure after opening.
    #[error("camera device failure: {0}")]
    Device(String),
    /// Frame buffer shape is wrong.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    /// JPEG encoding failed.
    #[error("still encoding failed: {0}")]
    Encode(String),
}

impl CaptureError {
    /// Alert text shown to the user.
    pub fn user_notice(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied | CaptureError::Unavailable(_) => {
                "Could not access camera. Please ensure you have given permission."
            }
            _ => "Could not capture a photo. Please try again.",
        }
    }
}

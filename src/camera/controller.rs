//! Camera session state machine

use super::{
    CameraCapabilities, CameraControl, CameraPlatform, CameraStream, StreamConstraints,
};
use crate::{
    error::{CameraError, CapabilityError, Result, StudioError},
    services::OutputFormatHandler,
    types::{CaptureSource, CapturedImage, ImageMime},
};
use chrono::Utc;
use image::{imageops::FilterType, DynamicImage};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument, warn};

/// JPEG quality used for captured frames
pub const CAPTURE_JPEG_QUALITY: u8 = 95;

/// Lifecycle of a camera session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraState {
    #[default]
    Closed,
    Requesting,
    Streaming,
    Capturing,
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Requesting => "requesting",
            Self::Streaming => "streaming",
            Self::Capturing => "capturing",
        };
        f.write_str(name)
    }
}

/// Owns the camera stream from request to release
///
/// `closed -> requesting -> streaming -> (capturing) -> closed`. The stream is
/// released on [`close`](Self::close) and again on drop.
pub struct CameraController {
    platform: Arc<dyn CameraPlatform>,
    state: CameraState,
    stream: Option<Box<dyn CameraStream>>,
    capabilities: Option<CameraCapabilities>,
    zoom: Option<f32>,
    torch_on: bool,
    last_error: Option<CameraError>,
    jpeg_quality: u8,
}

impl fmt::Debug for CameraController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraController")
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .field("zoom", &self.zoom)
            .field("torch_on", &self.torch_on)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl CameraController {
    #[must_use]
    pub fn new(platform: Arc<dyn CameraPlatform>) -> Self {
        Self {
            platform,
            state: CameraState::Closed,
            stream: None,
            capabilities: None,
            zoom: None,
            torch_on: false,
            last_error: None,
            jpeg_quality: CAPTURE_JPEG_QUALITY,
        }
    }

    #[must_use]
    pub fn state(&self) -> CameraState {
        self.state
    }

    #[must_use]
    pub fn capabilities(&self) -> Option<&CameraCapabilities> {
        self.capabilities.as_ref()
    }

    /// Zoom level last applied
    #[must_use]
    pub fn zoom(&self) -> Option<f32> {
        self.zoom
    }

    #[must_use]
    pub fn torch_enabled(&self) -> bool {
        self.torch_on
    }

    /// Error that sent the session back to `closed`, if any
    #[must_use]
    pub fn last_error(&self) -> Option<&CameraError> {
        self.last_error.as_ref()
    }

    /// Request the camera and start streaming
    ///
    /// Without a camera the controller goes straight back to `closed` and no
    /// stream is requested. Otherwise the preferred constraints are tried
    /// first and the rear-camera fallback once.
    #[instrument(skip(self), fields(state = %self.state))]
    pub async fn open(&mut self) -> Result<()> {
        if matches!(self.state, CameraState::Streaming | CameraState::Capturing) {
            return Ok(());
        }
        self.state = CameraState::Requesting;
        self.last_error = None;

        match self.platform.has_camera().await {
            Ok(true) => {},
            Ok(false) => return Err(self.fail(CameraError::NoCamera)),
            Err(e) => return Err(self.fail(e)),
        }

        let stream = match self.platform.open_stream(&StreamConstraints::preferred()).await {
            Ok(stream) => stream,
            Err(first) => {
                warn!(error = %first, "preferred camera constraints rejected, retrying with fallback");
                match self.platform.open_stream(&StreamConstraints::fallback()).await {
                    Ok(stream) => stream,
                    Err(second) => return Err(self.fail(second)),
                }
            },
        };

        self.attach(stream);
        Ok(())
    }

    fn fail(&mut self, error: CameraError) -> StudioError {
        warn!(error = %error, "camera unavailable");
        self.state = CameraState::Closed;
        self.last_error = Some(error.clone());
        error.into()
    }

    fn attach(&mut self, mut stream: Box<dyn CameraStream>) {
        let caps = stream.capabilities();
        self.zoom = None;
        self.torch_on = false;

        if let Some(range) = caps.zoom {
            match stream.apply(CameraControl::Zoom(range.min)) {
                Ok(()) => self.zoom = Some(range.min),
                Err(e) => warn!(error = %e, "could not reset zoom"),
            }
        }
        if caps.focus_continuous {
            if let Err(e) = stream.apply(CameraControl::FocusContinuous) {
                warn!(error = %e, "continuous focus not applied");
            }
        }
        if caps.white_balance_continuous {
            if let Err(e) = stream.apply(CameraControl::WhiteBalanceContinuous) {
                warn!(error = %e, "continuous white balance not applied");
            }
        }

        let (width, height) = stream.native_resolution();
        info!(width, height, zoom = ?caps.zoom, torch = caps.torch, "camera streaming");
        self.capabilities = Some(caps);
        self.stream = Some(stream);
        self.state = CameraState::Streaming;
    }

    /// Set zoom, clamped to the supported range; returns the applied value
    pub fn set_zoom(&mut self, value: f32) -> std::result::Result<f32, CapabilityError> {
        let range = self
            .capabilities
            .as_ref()
            .and_then(|c| c.zoom)
            .ok_or(CapabilityError::Unsupported("zoom"))?;
        let stream = self.stream.as_mut().ok_or(CapabilityError::NoStream)?;
        let clamped = range.clamp(value);
        stream.apply(CameraControl::Zoom(clamped))?;
        self.zoom = Some(clamped);
        debug!(requested = value, applied = clamped, "zoom set");
        Ok(clamped)
    }

    /// Switch the torch on or off
    pub fn set_torch(&mut self, on: bool) -> std::result::Result<(), CapabilityError> {
        let stream = self.stream.as_mut().ok_or(CapabilityError::NoStream)?;
        if !self.capabilities.as_ref().is_some_and(|c| c.torch) {
            return Err(CapabilityError::Unsupported("torch"));
        }
        stream.apply(CameraControl::Torch(on))?;
        self.torch_on = on;
        Ok(())
    }

    /// Capture the current frame as a JPEG
    #[instrument(skip(self))]
    pub async fn capture(&mut self) -> Result<CapturedImage> {
        if self.state != CameraState::Streaming {
            return Err(CameraError::NotStreaming.into());
        }
        let stream = self.stream.as_mut().ok_or(CameraError::NotStreaming)?;
        self.state = CameraState::Capturing;

        let native = stream.native_resolution();
        let grabbed = stream.grab_frame().await;
        self.state = CameraState::Streaming;
        let mut frame = grabbed?;

        if native.0 > 0 && native.1 > 0 && frame.dimensions() != native {
            debug!(?native, got = ?frame.dimensions(), "resampling frame to native resolution");
            frame = image::imageops::resize(&frame, native.0, native.1, FilterType::Triangle);
        }
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(CameraError::Capture("empty frame".to_string()).into());
        }

        let bytes = OutputFormatHandler::encode_jpeg(&DynamicImage::ImageRgba8(frame), self.jpeg_quality)
            .map_err(|e| CameraError::Capture(e.to_string()))?;
        info!(width, height, bytes = bytes.len(), "frame captured");
        Ok(CapturedImage {
            bytes,
            mime: ImageMime::Jpeg,
            width,
            height,
            source: CaptureSource::Camera,
            captured_at: Utc::now(),
        })
    }

    /// Torch off, stop every track, back to `closed`
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if self.torch_on {
                if let Err(e) = stream.apply(CameraControl::Torch(false)) {
                    warn!(error = %e, "could not switch torch off");
                }
            }
            stream.stop_tracks();
            debug!("camera tracks stopped");
        }
        self.torch_on = false;
        self.zoom = None;
        self.capabilities = None;
        self.state = CameraState::Closed;
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.close();
    }
}

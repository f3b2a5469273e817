//! Scripted camera platform for tests and headless demos
//!
//! The mock records every platform and stream call so tests can assert the
//! exact negotiation sequence without real hardware.

use super::{
    CameraCapabilities, CameraControl, CameraPlatform, CameraStream, StreamConstraints, ZoomRange,
};
use crate::error::{CameraError, CapabilityError};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::sync::{Arc, Mutex};

fn record(log: &Arc<Mutex<Vec<String>>>, entry: String) {
    if let Ok(mut history) = log.lock() {
        history.push(entry);
    }
}

/// Mock camera platform
#[derive(Debug, Clone)]
pub struct MockCameraPlatform {
    has_camera: bool,
    fail_preferred: bool,
    fail_fallback: bool,
    open_error: CameraError,
    capabilities: CameraCapabilities,
    resolution: (u32, u32),
    reject_controls: bool,
    call_history: Arc<Mutex<Vec<String>>>,
    stream_events: Arc<Mutex<Vec<String>>>,
}

impl Default for MockCameraPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCameraPlatform {
    /// A working rear camera with zoom 1-8, torch and continuous focus
    #[must_use]
    pub fn new() -> Self {
        Self {
            has_camera: true,
            fail_preferred: false,
            fail_fallback: false,
            open_error: CameraError::Hardware("OverconstrainedError".to_string()),
            capabilities: CameraCapabilities {
                zoom: Some(ZoomRange {
                    min: 1.0,
                    max: 8.0,
                    step: 0.1,
                }),
                torch: true,
                focus_continuous: true,
                white_balance_continuous: true,
            },
            resolution: (64, 48),
            reject_controls: false,
            call_history: Arc::new(Mutex::new(Vec::new())),
            stream_events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A device without any video input
    #[must_use]
    pub fn no_camera() -> Self {
        Self {
            has_camera: false,
            ..Self::new()
        }
    }

    /// Rejects the preferred constraints but accepts the fallback
    #[must_use]
    pub fn new_failing_preferred() -> Self {
        Self {
            fail_preferred: true,
            ..Self::new()
        }
    }

    /// Rejects every stream request with `error`
    #[must_use]
    pub fn new_failing_all(error: CameraError) -> Self {
        Self {
            fail_preferred: true,
            fail_fallback: true,
            open_error: error,
            ..Self::new()
        }
    }

    /// Every control update is rejected by the track
    #[must_use]
    pub fn rejecting_controls(mut self) -> Self {
        self.reject_controls = true;
        self
    }

    #[must_use]
    pub fn without_torch(mut self) -> Self {
        self.capabilities.torch = false;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CameraCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Platform calls in order (`has_camera`, `open_stream:preferred`, ...)
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Stream calls in order (`apply:zoom=1`, `grab_frame`, `stop_tracks`, ...)
    pub fn stream_events(&self) -> Vec<String> {
        self.stream_events.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CameraPlatform for MockCameraPlatform {
    async fn has_camera(&self) -> Result<bool, CameraError> {
        record(&self.call_history, "has_camera".to_string());
        Ok(self.has_camera)
    }

    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        let preferred = constraints.width.is_some();
        record(
            &self.call_history,
            format!(
                "open_stream:{}",
                if preferred { "preferred" } else { "fallback" }
            ),
        );
        if (preferred && self.fail_preferred) || (!preferred && self.fail_fallback) {
            return Err(self.open_error.clone());
        }
        Ok(Box::new(MockCameraStream {
            capabilities: self.capabilities.clone(),
            resolution: self.resolution,
            reject_controls: self.reject_controls,
            stopped: false,
            events: Arc::clone(&self.stream_events),
        }))
    }
}

/// Stream handed out by [`MockCameraPlatform`]
#[derive(Debug)]
pub struct MockCameraStream {
    capabilities: CameraCapabilities,
    resolution: (u32, u32),
    reject_controls: bool,
    stopped: bool,
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl CameraStream for MockCameraStream {
    fn capabilities(&self) -> CameraCapabilities {
        self.capabilities.clone()
    }

    fn apply(&mut self, control: CameraControl) -> Result<(), CapabilityError> {
        let entry = match control {
            CameraControl::Zoom(v) => format!("apply:zoom={v}"),
            CameraControl::Torch(on) => format!("apply:torch={on}"),
            other => format!("apply:{}", other.name()),
        };
        record(&self.events, entry);
        if self.reject_controls {
            return Err(CapabilityError::Rejected {
                control: control.name(),
                reason: "NotReadableError".to_string(),
            });
        }
        Ok(())
    }

    fn native_resolution(&self) -> (u32, u32) {
        self.resolution
    }

    async fn grab_frame(&mut self) -> Result<RgbaImage, CameraError> {
        record(&self.events, "grab_frame".to_string());
        if self.stopped {
            return Err(CameraError::NotStreaming);
        }
        let (w, h) = self.resolution;
        Ok(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 128, 255])
        }))
    }

    fn stop_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            record(&self.events, "stop_tracks".to_string());
        }
    }
}

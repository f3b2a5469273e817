//! Camera capture behind injected platform interfaces
//!
//! Device access is platform-specific, so the controller only talks to the
//! [`CameraPlatform`] and [`CameraStream`] traits. Hosts supply real
//! implementations; [`test_utils`] provides scripted mocks.

pub mod controller;
pub mod test_utils;

use crate::{
    error::{CameraError, CapabilityError},
    types::FacingMode,
};
use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

pub use controller::{CameraController, CameraState};

/// Stream request sent to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConstraints {
    pub facing: FacingMode,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
    pub focus_continuous: bool,
}

impl StreamConstraints {
    /// Preferred request: rear camera at 4K/60 with continuous focus
    #[must_use]
    pub fn preferred() -> Self {
        Self {
            facing: FacingMode::Environment,
            width: Some(3840),
            height: Some(2160),
            frame_rate: Some(60),
            focus_continuous: true,
        }
    }

    /// Second attempt after the preferred request fails: rear camera only
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            facing: FacingMode::Environment,
            width: None,
            height: None,
            frame_rate: None,
            focus_continuous: false,
        }
    }
}

/// Zoom range exposed by the active track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ZoomRange {
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// Capabilities negotiated once the stream is open
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraCapabilities {
    pub zoom: Option<ZoomRange>,
    pub torch: bool,
    pub focus_continuous: bool,
    pub white_balance_continuous: bool,
}

/// A single constraint update applied to the live track
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraControl {
    Zoom(f32),
    Torch(bool),
    FocusContinuous,
    WhiteBalanceContinuous,
}

impl CameraControl {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zoom(_) => "zoom",
            Self::Torch(_) => "torch",
            Self::FocusContinuous => "focus mode",
            Self::WhiteBalanceContinuous => "white balance mode",
        }
    }
}

/// Device discovery and stream acquisition
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Whether any video input device exists
    async fn has_camera(&self) -> Result<bool, CameraError>;

    /// Open a stream satisfying `constraints`
    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// An open camera stream, exclusively owned by the controller
///
/// Control updates and track shutdown are synchronous so that teardown can
/// run from `Drop`.
#[async_trait]
pub trait CameraStream: Send + Sync {
    fn capabilities(&self) -> CameraCapabilities;

    /// Apply a constraint update to the video track
    fn apply(&mut self, control: CameraControl) -> Result<(), CapabilityError>;

    /// Frame size the track actually delivers
    fn native_resolution(&self) -> (u32, u32);

    /// Grab the current frame
    async fn grab_frame(&mut self) -> Result<RgbaImage, CameraError>;

    /// Stop every track; idempotent
    fn stop_tracks(&mut self);
}

//! Boundary to the hosted generative-image API
//!
//! The pipeline only depends on [`GenerativeBackend`]. [`GeminiClient`] is
//! the HTTP implementation; [`test_utils::MockGenerativeBackend`] scripts
//! responses for tests.

pub mod gemini;
pub mod prompts;
pub mod test_utils;
pub mod video;

use crate::{
    error::{Result, StudioError},
    services::OutputFormatHandler,
    types::{CapturedImage, ImageMime},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use gemini::GeminiClient;
pub use video::VideoPoller;

/// What the caller expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Image,
    Json,
}

/// Requested output aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Landscape => "4:3",
            Self::Story => "9:16",
            Self::Wide => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded image sent inline with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
}

impl InlineImage {
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime: ImageMime) -> Self {
        Self { bytes, mime }
    }

    #[must_use]
    pub fn from_captured(captured: &CapturedImage) -> Self {
        Self::new(captured.bytes.clone(), captured.mime)
    }

    /// Encode a raster as PNG
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        Ok(Self::new(OutputFormatHandler::encode_png(image)?, ImageMime::Png))
    }

    /// Decode a base64 payload, sniffing the real container when possible
    pub fn from_base64(data: &str, declared_mime: Option<&str>) -> Result<Self> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| StudioError::generation(format!("invalid base64 image payload: {e}")))?;
        let mime = ImageMime::sniff(&bytes)
            .or_else(|| declared_mime.and_then(ImageMime::parse))
            .unwrap_or(ImageMime::Png);
        Ok(Self::new(bytes, mime))
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }
}

/// One multimodal generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerativeRequest {
    pub images: Vec<InlineImage>,
    pub instruction: String,
    pub response_format: ResponseFormat,
    pub aspect_ratio: Option<AspectRatio>,
}

impl GenerativeRequest {
    /// Image-producing request with no input images yet
    #[must_use]
    pub fn new<S: Into<String>>(instruction: S) -> Self {
        Self {
            images: Vec::new(),
            instruction: instruction.into(),
            response_format: ResponseFormat::Image,
            aspect_ratio: None,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.images.push(image);
        self
    }

    #[must_use]
    pub fn expecting_json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    #[must_use]
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }
}

/// What came back from a generation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerativeResponse {
    pub image: Option<InlineImage>,
    pub json: Option<serde_json::Value>,
}

impl GenerativeResponse {
    #[must_use]
    pub fn image_bytes(&self) -> Option<&[u8]> {
        self.image.as_ref().map(|i| i.bytes.as_slice())
    }

    /// Decode the returned image; a missing or empty image is an error
    pub fn into_image(self) -> Result<DynamicImage> {
        let inline = self
            .image
            .filter(|i| !i.bytes.is_empty())
            .ok_or_else(|| StudioError::generation("response contained no image"))?;
        let decoded = inline.decode()?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(StudioError::generation("response image is empty"));
        }
        Ok(decoded)
    }

    /// Take the JSON payload; missing JSON is an error
    pub fn into_json(self) -> Result<serde_json::Value> {
        self.json
            .ok_or_else(|| StudioError::generation("response contained no JSON"))
    }
}

/// Long-running video request
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRequest {
    pub image: InlineImage,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

/// Handle to a started video operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOperation {
    pub name: String,
}

/// Poll result for a video operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoStatus {
    Running,
    Done(Vec<u8>),
}

/// Hosted multimodal model
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerativeRequest) -> Result<GenerativeResponse>;

    /// Start a product video; backends without video support refuse
    async fn start_video(&self, request: &VideoRequest) -> Result<VideoOperation> {
        let _ = request;
        Err(StudioError::generation(format!(
            "{} does not support video generation",
            self.name()
        )))
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoStatus> {
        let _ = operation;
        Err(StudioError::generation(format!(
            "{} does not support video generation",
            self.name()
        )))
    }
}

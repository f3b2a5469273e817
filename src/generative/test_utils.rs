//! Scripted generative backend for tests and offline demos

use super::{
    GenerativeBackend, GenerativeRequest, GenerativeResponse, InlineImage, ResponseFormat,
    VideoOperation, VideoRequest, VideoStatus,
};
use crate::error::{Result, StudioError};
use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// White 400x300 canvas with a dark 120x80 "jewel" in the middle
#[must_use]
pub fn sample_treated_image() -> DynamicImage {
    let mut img = RgbaImage::from_pixel(400, 300, Rgba([255, 255, 255, 255]));
    for y in 110..190 {
        for x in 140..260 {
            img.put_pixel(x, y, Rgba([40, 30, 20, 255]));
        }
    }
    DynamicImage::ImageRgba8(img)
}

/// Mock generative backend
///
/// Image requests return a fixed image, JSON requests a fixed classification.
/// Requests whose instruction contains a configured needle fail.
#[derive(Debug, Clone)]
pub struct MockGenerativeBackend {
    image: Option<DynamicImage>,
    json: serde_json::Value,
    fail_all: bool,
    fail_needles: Vec<String>,
    delay: Option<Duration>,
    video_running_polls: u32,
    video_bytes: Vec<u8>,
    video_supported: bool,
    polls: Arc<AtomicU32>,
    call_history: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<GenerativeRequest>>>,
}

impl Default for MockGenerativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerativeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            image: Some(sample_treated_image()),
            json: serde_json::json!({
                "category": "RING",
                "material": "gold",
                "gender": "FEMALE"
            }),
            fail_all: false,
            fail_needles: Vec::new(),
            delay: None,
            video_running_polls: 0,
            video_bytes: b"\x00\x00\x00\x18ftypmp42".to_vec(),
            video_supported: true,
            polls: Arc::new(AtomicU32::new(0)),
            call_history: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every call fails, as if the network were down
    #[must_use]
    pub fn new_failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    /// Image calls succeed but carry no image part
    #[must_use]
    pub fn new_without_images() -> Self {
        Self {
            image: None,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: DynamicImage) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn with_classification(mut self, json: serde_json::Value) -> Self {
        self.json = json;
        self
    }

    /// Fail requests whose instruction contains `needle`
    #[must_use]
    pub fn failing_on<S: Into<String>>(mut self, needle: S) -> Self {
        self.fail_needles.push(needle.into());
        self
    }

    /// Sleep before answering each generate call
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report `Running` this many times before returning `bytes`
    #[must_use]
    pub fn with_video_after_polls(mut self, running_polls: u32, bytes: Vec<u8>) -> Self {
        self.video_running_polls = running_polls;
        self.video_bytes = bytes;
        self
    }

    #[must_use]
    pub fn without_video(mut self) -> Self {
        self.video_supported = false;
        self
    }

    /// Get call history for verification
    #[must_use]
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.get_call_history()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// All generate requests seen so far
    #[must_use]
    pub fn requests(&self) -> Vec<GenerativeRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, entry: String) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(entry);
        }
    }

    fn should_fail(&self, instruction: &str) -> bool {
        self.fail_all || self.fail_needles.iter().any(|n| instruction.contains(n.as_str()))
    }
}

#[async_trait]
impl GenerativeBackend for MockGenerativeBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerativeRequest) -> Result<GenerativeResponse> {
        let kind = match request.response_format {
            ResponseFormat::Image => "image",
            ResponseFormat::Json => "json",
        };
        self.record(format!("generate:{kind}"));
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail(&request.instruction) {
            return Err(StudioError::generation("mock backend failure"));
        }

        match request.response_format {
            ResponseFormat::Image => Ok(GenerativeResponse {
                image: self.image.as_ref().map(InlineImage::from_image).transpose()?,
                json: None,
            }),
            ResponseFormat::Json => Ok(GenerativeResponse {
                image: None,
                json: Some(self.json.clone()),
            }),
        }
    }

    async fn start_video(&self, request: &VideoRequest) -> Result<VideoOperation> {
        self.record("start_video".to_string());
        if !self.video_supported || self.should_fail(&request.prompt) {
            return Err(StudioError::generation("mock video failure"));
        }
        self.polls.store(0, Ordering::SeqCst);
        Ok(VideoOperation {
            name: "operations/mock-video".to_string(),
        })
    }

    async fn poll_video(&self, _operation: &VideoOperation) -> Result<VideoStatus> {
        self.record("poll_video".to_string());
        if self.fail_all {
            return Err(StudioError::generation("mock poll failure"));
        }
        let seen = self.polls.fetch_add(1, Ordering::SeqCst);
        if seen < self.video_running_polls {
            Ok(VideoStatus::Running)
        } else {
            Ok(VideoStatus::Done(self.video_bytes.clone()))
        }
    }
}

#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

//! # Jewel Studio
//!
//! Jewelry photo studio pipeline: a captured or uploaded product photo is
//! retouched by a hosted generative-image model, the near-white studio
//! background is stripped, the product is located and composited into
//! catalog layouts with a mirror reflection and a contrast-aware brand mark,
//! and optional editorial model shots and product videos are generated.
//!
//! ## Features
//!
//! - **Background stripping** and **content bounds** over `image::RgbaImage`
//! - **Compositing** into bounded envelopes with a faded mirror reflection
//! - **Branding** in a dark or light tone chosen from the sampled luminance
//! - **Camera capture** state machine over injected platform traits
//! - **Generative boundary** with an HTTP client and a scripted mock
//! - **Session state** that ignores completions of superseded jobs
//! - **CLI** (enable with the `cli` feature, on by default)
//!
//! ## Quick Start
//!
//! Compose an already retouched photo without any network access:
//!
//! ```rust
//! use jewel_studio::{
//!     generative::test_utils::{sample_treated_image, MockGenerativeBackend},
//!     StudioConfig, StudioProcessor,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> jewel_studio::Result<()> {
//! let config = StudioConfig::builder().catalog_size(400, 400).build()?;
//! let mut processor = StudioProcessor::new(config, Arc::new(MockGenerativeBackend::new()))?;
//!
//! let result = processor.compose_local(&sample_treated_image())?;
//! assert!(result.branded.is_ready());
//! # Ok(())
//! # }
//! ```
//!
//! The full pipeline talks to the hosted model:
//!
//! ```rust,no_run
//! use jewel_studio::{
//!     generative::GeminiClient, services::ImageIOService, StudioConfig, StudioProcessor,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = StudioConfig::default();
//! let client = GeminiClient::new(config.api.clone())?;
//! let mut processor = StudioProcessor::new(config, Arc::new(client))?;
//!
//! let captured = ImageIOService::load_captured("ring.jpg")?;
//! let result = processor.process_capture(&captured).await?;
//! println!("ready: {:?}", result.ready_parts());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, spinner and tracing subscriber
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: log file output for the CLI
//! - `webp-support`: WebP uploads

pub mod camera;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod generative;
pub mod imaging;
pub mod processor;
pub mod services;
pub mod session;
pub mod share;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Public API exports
pub use camera::{
    CameraCapabilities, CameraControl, CameraController, CameraPlatform, CameraState,
    CameraStream, StreamConstraints, ZoomRange,
};
pub use config::{
    ApiConfig, BrandingConfig, OutputFormat, PollConfig, ReflectionConfig, StudioConfig,
    StudioConfigBuilder,
};
pub use error::{CameraError, CapabilityError, RecoveryAction, Result, StudioError, UserMessage};
pub use generative::{
    GeminiClient, GenerativeBackend, GenerativeRequest, GenerativeResponse, InlineImage,
    ResponseFormat, VideoPoller,
};
pub use imaging::{
    apply_adjustments, find_content_bounds, strip_background, BrandMark, BrandTone,
    BrandingOverlay, CompositeLayout, Compositor, ContentBounds, Envelope, ReflectionStyle,
};
pub use processor::{CatalogSet, StudioProcessor, StudioProcessorBuilder};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use session::{JobTicket, StudioSession};
pub use share::{share_or_copy, SharePayload, ShareOutcome, ShareSurface};
pub use types::{
    CaptureSource, CapturedImage, Classification, EditParameters, FacingMode, ImageMime,
    JewelryCategory, ProcessingResult, ProcessingState, ProcessingTimings, Rect, StageOutcome,
    SubjectGender,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat, TracingOutput};

//! Unified studio processor
//!
//! `StudioProcessor` owns the whole capture-to-catalog pipeline: retouching
//! through the generative backend, background stripping, bounds detection,
//! catalog and diptych compositing, branding, the editorial model shot and the
//! optional product video. The CLI and any other frontend go through it so
//! they all produce the same derived images.

use crate::{
    config::StudioConfig,
    error::{Result, StudioError},
    generative::{
        prompts, AspectRatio, GenerativeBackend, GenerativeRequest, InlineImage, VideoPoller,
        VideoRequest,
    },
    imaging::{
        apply_adjustments, find_content_bounds, strip_background, BrandMark, BrandingOverlay,
        CompositeLayout, Compositor, ContentBounds,
    },
    services::{ProcessingStage, ProgressTracker},
    session::StudioSession,
    types::{
        CaptureSource, CapturedImage, Classification, EditParameters, ProcessingResult,
        ProcessingTimings, Rect, StageOutcome,
    },
};
use image::{imageops, DynamicImage, RgbaImage};
use instant::Instant;
use log::{debug, info, warn};
use std::sync::Arc;
use tracing::{info as trace_info, instrument, span, Level};

/// Local products of one treated image
#[derive(Debug, Clone)]
pub struct CatalogSet {
    /// Treated image with the near-white background made transparent
    pub stripped: RgbaImage,
    pub bounds: ContentBounds,
    /// `stripped` cropped to `bounds`
    pub cutout: RgbaImage,
    /// Catalog composite without brand mark
    pub clean: Option<RgbaImage>,
    /// Catalog composite with brand mark
    pub branded: Option<RgbaImage>,
}

/// Studio processor
pub struct StudioProcessor {
    config: StudioConfig,
    backend: Arc<dyn GenerativeBackend>,
    compositor: Compositor,
    branding: Option<BrandingOverlay>,
    poller: VideoPoller,
    progress_tracker: Option<ProgressTracker>,
}

impl std::fmt::Debug for StudioProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioProcessor")
            .field("backend", &self.backend.name())
            .field("compositor", &self.compositor)
            .field("branding", &self.branding.is_some())
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl StudioProcessor {
    /// Create a processor with the default monogram brand mark
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(config: StudioConfig, backend: Arc<dyn GenerativeBackend>) -> Result<Self> {
        Self::builder(config, backend).build()
    }

    #[must_use]
    pub fn builder(config: StudioConfig, backend: Arc<dyn GenerativeBackend>) -> StudioProcessorBuilder {
        StudioProcessorBuilder::new(config, backend)
    }

    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Replace the progress tracker used for subsequent runs
    pub fn set_progress_tracker(&mut self, tracker: ProgressTracker) {
        self.progress_tracker = Some(tracker);
    }

    fn report(&mut self, stage: ProcessingStage) {
        if let Some(tracker) = self.progress_tracker.as_mut() {
            tracker.report_stage(stage);
        }
    }

    fn report_error(&self, error: &StudioError) {
        if let Some(tracker) = self.progress_tracker.as_ref() {
            tracker.report_error(&error.to_string());
        }
    }

    fn report_completion(&mut self, timings: &ProcessingTimings) {
        self.report(ProcessingStage::Completed);
        if let Some(tracker) = self.progress_tracker.as_ref() {
            tracker.report_completion(timings.clone());
        }
    }

    /// Run the whole pipeline on a capture
    ///
    /// Treatment failure fails the run. Editorial and video failures are kept
    /// as `Failed` parts; everything else in the result stays valid.
    #[instrument(
        skip(self, captured),
        fields(
            backend = %self.backend.name(),
            dimensions = %format!("{}x{}", captured.width, captured.height)
        )
    )]
    pub async fn process_capture(&mut self, captured: &CapturedImage) -> Result<ProcessingResult> {
        let total_start = Instant::now();
        let mut result = self.process_treatment(captured).await?;
        self.complete(&mut result).await;
        result.timings.total_ms = total_start.elapsed().as_millis() as u64;
        self.report_completion(&result.timings);
        Ok(result)
    }

    /// Run the pipeline and publish into a session in two stages
    ///
    /// The treated catalog is published first; the editorial, diptych and
    /// video are merged afterwards. If the session was reset meanwhile the
    /// late parts are dropped.
    pub async fn process_into_session(
        &mut self,
        session: &StudioSession,
        captured: &CapturedImage,
    ) -> Result<()> {
        let total_start = Instant::now();
        let ticket = session.begin_job(ProcessingStage::Treatment.loading_message());

        let mut result = match self.process_treatment(captured).await {
            Ok(result) => result,
            Err(e) => {
                session.fail(ticket, &e);
                return Err(e);
            }
        };

        if !session.publish(ticket, result.clone()) {
            debug!("Session was reset during treatment; dropping result");
            return Ok(());
        }

        self.complete(&mut result).await;
        result.timings.total_ms = total_start.elapsed().as_millis() as u64;
        self.report_completion(&result.timings);

        let merged = session.merge(ticket, |current| {
            current.editorial = result.editorial;
            current.composite = result.composite;
            current.video = result.video;
            current.timings = result.timings;
        });
        if !merged {
            debug!("Session was reset during editorial generation; dropping late parts");
        }
        Ok(())
    }

    /// Treatment, classification and the local catalog
    async fn process_treatment(&mut self, captured: &CapturedImage) -> Result<ProcessingResult> {
        let mut result = ProcessingResult::default();

        self.report(ProcessingStage::Treatment);
        let treatment_start = Instant::now();
        let treated = match self.treat(captured).await {
            Ok(treated) => treated,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            }
        };
        result.classification = self.classify(captured).await;
        result.timings.treatment_ms = treatment_start.elapsed().as_millis() as u64;

        let catalog = self.build_catalog(&treated, None, &mut result.timings)?;
        self.fill_catalog(&mut result, treated, catalog);
        Ok(result)
    }

    /// Editorial, diptych and video for an already treated result
    async fn complete(&mut self, result: &mut ProcessingResult) {
        let Some(treated) = result.treated.ready().cloned() else {
            return;
        };
        let classification = result.classification.clone().unwrap_or_default();

        if self.config.editorial {
            self.report(ProcessingStage::Editorial);
            let start = Instant::now();
            result.editorial = match self.generate_editorial(&treated, &classification).await {
                Ok(editorial) => StageOutcome::from_image(editorial),
                Err(e) => {
                    warn!("Editorial generation failed: {e}");
                    StageOutcome::Failed(e.to_string())
                }
            };
            result.timings.editorial_ms = Some(start.elapsed().as_millis() as u64);
        } else {
            result.editorial = StageOutcome::Skipped;
        }

        result.composite = self.diptych_outcome(result);

        if self.config.video {
            self.report(ProcessingStage::VideoGeneration);
            let start = Instant::now();
            result.video = match self.generate_video(&treated, &classification).await {
                Ok(bytes) => StageOutcome::from_bytes(bytes),
                Err(e) => {
                    warn!("Video generation failed: {e}");
                    StageOutcome::Failed(e.to_string())
                }
            };
            result.timings.video_ms = Some(start.elapsed().as_millis() as u64);
        } else {
            result.video = StageOutcome::Skipped;
        }
    }

    fn diptych_outcome(&mut self, result: &mut ProcessingResult) -> StageOutcome<DynamicImage> {
        if !self.config.composites {
            return StageOutcome::Skipped;
        }
        let editorial = match &result.editorial {
            StageOutcome::Ready(editorial) => editorial.to_rgba8(),
            StageOutcome::Failed(message) => return StageOutcome::Failed(message.clone()),
            StageOutcome::Skipped => return StageOutcome::Skipped,
            StageOutcome::Pending => return StageOutcome::Pending,
        };
        let Some(cutout) = result.cutout.ready().map(DynamicImage::to_rgba8) else {
            return StageOutcome::Pending;
        };

        self.report(ProcessingStage::Compositing);
        let start = Instant::now();
        let bounds = Rect::full(cutout.width(), cutout.height());
        let outcome = match self.compose_diptych(&cutout, bounds, &editorial) {
            Ok(diptych) => StageOutcome::from_image(DynamicImage::ImageRgba8(diptych)),
            Err(e) => {
                warn!("Diptych composition failed: {e}");
                StageOutcome::Failed(e.to_string())
            }
        };
        result.timings.compositing_ms += start.elapsed().as_millis() as u64;
        outcome
    }

    fn fill_catalog(&self, result: &mut ProcessingResult, treated: DynamicImage, catalog: CatalogSet) {
        result.treated = StageOutcome::from_image(treated);
        result.cutout = StageOutcome::from_image(DynamicImage::ImageRgba8(catalog.cutout));
        result.clean = match catalog.clean {
            Some(clean) => StageOutcome::from_image(DynamicImage::ImageRgba8(clean)),
            None => StageOutcome::Skipped,
        };
        result.branded = match catalog.branded {
            Some(branded) => StageOutcome::from_image(DynamicImage::ImageRgba8(branded)),
            None => StageOutcome::Skipped,
        };
    }

    /// Retouch a capture onto pure white
    ///
    /// # Errors
    /// - Generative backend failure or a response without a usable image
    pub async fn treat(&self, captured: &CapturedImage) -> Result<DynamicImage> {
        let request = GenerativeRequest::new(prompts::treatment())
            .with_image(InlineImage::from_captured(captured));
        let treated = self.backend.generate(&request).await?.into_image()?;
        trace_info!(
            width = treated.width(),
            height = treated.height(),
            "Treatment received"
        );
        Ok(treated)
    }

    /// Classify the capture; failures fall back to `None`
    pub async fn classify(&self, captured: &CapturedImage) -> Option<Classification> {
        let request = GenerativeRequest::new(prompts::classification())
            .with_image(InlineImage::from_captured(captured))
            .expecting_json();
        match self.backend.generate(&request).await.and_then(|r| r.into_json()) {
            Ok(json) => Some(Classification::from_json(&json)),
            Err(e) => {
                warn!("Classification failed, using defaults: {e}");
                None
            }
        }
    }

    /// Model shot of the treated product
    ///
    /// # Errors
    /// - Generative backend failure or a response without a usable image
    pub async fn generate_editorial(
        &self,
        treated: &DynamicImage,
        classification: &Classification,
    ) -> Result<DynamicImage> {
        let request = GenerativeRequest::new(prompts::editorial(classification))
            .with_image(InlineImage::from_image(treated)?)
            .with_aspect_ratio(AspectRatio::Portrait);
        self.backend.generate(&request).await?.into_image()
    }

    /// Start a product video and wait for it with the configured poller
    ///
    /// # Errors
    /// - Backend refuses or fails the video request
    /// - `StudioError::Timeout` when polling runs out of attempts
    pub async fn generate_video(
        &self,
        treated: &DynamicImage,
        classification: &Classification,
    ) -> Result<Vec<u8>> {
        let request = VideoRequest {
            image: InlineImage::from_image(treated)?,
            prompt: prompts::video(classification),
            aspect_ratio: AspectRatio::Story,
        };
        let operation = self.backend.start_video(&request).await?;
        info!("Video generation started: {}", operation.name);
        self.poller.wait(self.backend.as_ref(), &operation).await
    }

    /// Strip, bound and compose an already treated image without any network call
    ///
    /// # Errors
    /// - Compositing failure (for example a degenerate canvas)
    pub fn compose_local(&mut self, treated: &DynamicImage) -> Result<ProcessingResult> {
        self.compose_edited(treated, None)
    }

    /// Like [`Self::compose_local`], with user adjustments applied
    ///
    /// Color knobs are applied to the clean composite before branding; the
    /// reflection intensity replaces the configured reflection opacity.
    ///
    /// # Errors
    /// - Compositing failure
    pub fn compose_edited(
        &mut self,
        treated: &DynamicImage,
        params: Option<&EditParameters>,
    ) -> Result<ProcessingResult> {
        let total_start = Instant::now();
        let mut result = ProcessingResult::default();
        let catalog = self.build_catalog(treated, params, &mut result.timings)?;
        self.fill_catalog(&mut result, treated.clone(), catalog);
        result.classification = None;
        result.editorial = StageOutcome::Skipped;
        result.composite = StageOutcome::Skipped;
        result.video = StageOutcome::Skipped;
        result.timings.total_ms = total_start.elapsed().as_millis() as u64;
        self.report_completion(&result.timings);
        Ok(result)
    }

    /// Stripped raster, bounds, cut-out and catalog composites
    ///
    /// # Errors
    /// - Compositing failure
    pub fn build_catalog(
        &mut self,
        treated: &DynamicImage,
        params: Option<&EditParameters>,
        timings: &mut ProcessingTimings,
    ) -> Result<CatalogSet> {
        let (stripped, bounds) = {
            let _span = span!(
                Level::DEBUG,
                "background_stripping",
                width = treated.width(),
                height = treated.height()
            )
            .entered();
            self.report(ProcessingStage::BackgroundStripping);
            let start = Instant::now();
            let stripped = strip_background(&treated.to_rgba8(), self.config.background_threshold);
            self.report(ProcessingStage::BoundsDetection);
            let bounds = find_content_bounds(&stripped, self.config.alpha_noise_threshold);
            if bounds.is_fallback {
                warn!("No visible content after background stripping; using the full canvas");
            }
            timings.stripping_ms += start.elapsed().as_millis() as u64;
            (stripped, bounds)
        };

        let r = bounds.rect;
        let cutout = imageops::crop_imm(&stripped, r.x, r.y, r.width, r.height).to_image();

        if !self.config.composites {
            return Ok(CatalogSet {
                stripped,
                bounds,
                cutout,
                clean: None,
                branded: None,
            });
        }

        let _span = span!(Level::DEBUG, "compositing", bounds = %r).entered();
        self.report(ProcessingStage::Compositing);
        let start = Instant::now();

        let compositor = match params {
            Some(p) => {
                let p = p.clamped();
                let style = self
                    .compositor
                    .reflection()
                    .map(|s| s.with_opacity(p.reflection_intensity));
                self.compositor.clone().with_reflection(style)
            }
            None => self.compositor.clone(),
        };

        let (width, height) = self.config.catalog_size;
        let reserved = self
            .branding
            .as_ref()
            .map_or(0, |b| b.reserved_height(height));
        let (mut clean, regions) =
            compositor.render(CompositeLayout::Catalog, &stripped, r, (width, height), reserved)?;
        debug!("Catalog product drawn at {}", regions.product);

        if let Some(p) = params {
            if !p.clamped().is_identity() {
                clean = apply_adjustments(&clean, p, self.config.adjust_protect_threshold);
            }
        }

        if self.branding.is_some() {
            self.report(ProcessingStage::Branding);
        }
        let branded = match &self.branding {
            Some(overlay) => {
                let mut branded = clean.clone();
                let tone = overlay.apply(&mut branded);
                debug!("Brand mark drawn in {tone} tone");
                Some(branded)
            }
            None => None,
        };
        timings.compositing_ms += start.elapsed().as_millis() as u64;

        Ok(CatalogSet {
            stripped,
            bounds,
            cutout,
            clean: Some(clean),
            branded,
        })
    }

    /// Product on the left, editorial on the right, brand mark under the product
    ///
    /// # Errors
    /// - Compositing failure
    pub fn compose_diptych(
        &self,
        stripped: &RgbaImage,
        bounds: Rect,
        editorial: &RgbaImage,
    ) -> Result<RgbaImage> {
        let (width, height) = self.config.diptych_size;
        let reserved = self
            .branding
            .as_ref()
            .map_or(0, |b| b.reserved_height(height));
        let (mut canvas, _) = self.compositor.render(
            CompositeLayout::Diptych { editorial },
            stripped,
            bounds,
            (width, height),
            reserved,
        )?;
        if let Some(overlay) = &self.branding {
            let rect = overlay.mark_rect(width / 2, height);
            overlay.apply_at(&mut canvas, rect);
        }
        Ok(canvas)
    }

    /// Apply the color knobs of `params` to any image
    #[must_use]
    pub fn adjust(&self, image: &DynamicImage, params: &EditParameters) -> DynamicImage {
        DynamicImage::ImageRgba8(apply_adjustments(
            &image.to_rgba8(),
            params,
            self.config.adjust_protect_threshold,
        ))
    }

    /// AI-refine an image with a free-text instruction
    ///
    /// # Errors
    /// - Empty instruction
    /// - Generative backend failure
    pub async fn refine(&self, image: &DynamicImage, instruction: &str) -> Result<DynamicImage> {
        if instruction.trim().is_empty() {
            return Err(StudioError::processing("refine instruction is empty"));
        }
        let request = GenerativeRequest::new(prompts::refine(instruction))
            .with_image(InlineImage::from_image(image)?);
        self.backend.generate(&request).await?.into_image()
    }

    /// Text-to-image product design
    ///
    /// The generated image is returned as a capture so it can enter the
    /// normal pipeline.
    ///
    /// # Errors
    /// - Empty prompt
    /// - Generative backend failure
    pub async fn create_from_prompt(&self, description: &str) -> Result<CapturedImage> {
        if description.trim().is_empty() {
            return Err(StudioError::processing("design prompt is empty"));
        }
        let request = GenerativeRequest::new(prompts::pro_design(description))
            .with_aspect_ratio(AspectRatio::Square);
        let response = self.backend.generate(&request).await?;
        let inline = response
            .image
            .filter(|i| !i.bytes.is_empty())
            .ok_or_else(|| StudioError::generation("design response contained no image"))?;
        CapturedImage::from_encoded(inline.bytes, CaptureSource::Generated)
    }

    /// Photo try-on: person photo first, jewelry photo second, 3:4 output
    ///
    /// # Errors
    /// - Generative backend failure
    pub async fn virtual_try_on(
        &self,
        person: &CapturedImage,
        jewel: &CapturedImage,
    ) -> Result<DynamicImage> {
        let request = GenerativeRequest::new(prompts::photo_try_on())
            .with_image(InlineImage::from_captured(person))
            .with_image(InlineImage::from_captured(jewel))
            .with_aspect_ratio(AspectRatio::Portrait);
        self.backend.generate(&request).await?.into_image()
    }
}

/// Builder for [`StudioProcessor`]
pub struct StudioProcessorBuilder {
    config: StudioConfig,
    backend: Arc<dyn GenerativeBackend>,
    mark: Option<BrandMark>,
    progress_tracker: Option<ProgressTracker>,
}

impl StudioProcessorBuilder {
    #[must_use]
    pub fn new(config: StudioConfig, backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            config,
            backend,
            mark: None,
            progress_tracker: None,
        }
    }

    /// Use a custom brand mark instead of the monogram
    #[must_use]
    pub fn brand_mark(mut self, mark: BrandMark) -> Self {
        self.mark = Some(mark);
        self
    }

    #[must_use]
    pub fn progress_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = Some(tracker);
        self
    }

    /// Validate the configuration and build the processor
    ///
    /// # Errors
    /// - Invalid configuration values
    pub fn build(self) -> Result<StudioProcessor> {
        self.config.validate()?;
        let compositor = Compositor::from_config(&self.config)?;
        let branding = self.config.branding.enabled.then(|| {
            BrandingOverlay::new(self.config.branding.clone(), self.mark.unwrap_or_default())
        });
        let poller = VideoPoller::from_config(&self.config.video_poll);
        Ok(StudioProcessor {
            config: self.config,
            backend: self.backend,
            compositor,
            branding,
            poller,
            progress_tracker: self.progress_tracker,
        })
    }
}

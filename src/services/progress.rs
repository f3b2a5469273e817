//! Progress reporting service
//!
//! This module separates progress reporting concerns from business logic,
//! allowing different frontends to implement their own progress handling.

use crate::types::ProcessingTimings;
use instant::Instant;
use std::sync::{Arc, Mutex};

/// Progress stages of the studio pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Reading the captured or uploaded image
    Capture,
    /// Retouching and classifying via the generative API
    Treatment,
    /// Making near-white pixels transparent
    BackgroundStripping,
    /// Finding the product's bounding box
    BoundsDetection,
    /// Rendering catalog and diptych layouts
    Compositing,
    /// Drawing the brand mark
    Branding,
    /// Generating the model shot
    Editorial,
    /// Generating and polling the product video
    VideoGeneration,
    /// Encoding results for download
    Encoding,
    /// Processing completed
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Capture => "Loading captured image",
            ProcessingStage::Treatment => "Retouching product photo",
            ProcessingStage::BackgroundStripping => "Removing studio background",
            ProcessingStage::BoundsDetection => "Locating product",
            ProcessingStage::Compositing => "Composing catalog images",
            ProcessingStage::Branding => "Applying brand mark",
            ProcessingStage::Editorial => "Generating editorial shot",
            ProcessingStage::VideoGeneration => "Generating product video",
            ProcessingStage::Encoding => "Encoding results",
            ProcessingStage::Completed => "Processing completed",
        }
    }

    /// Localized (pt-BR) loading message for UI surfaces
    #[must_use]
    pub fn loading_message(&self) -> &'static str {
        match self {
            ProcessingStage::Capture => "Carregando foto...",
            ProcessingStage::Treatment => "Tratando a joia...",
            ProcessingStage::BackgroundStripping
            | ProcessingStage::BoundsDetection
            | ProcessingStage::Compositing
            | ProcessingStage::Branding => "Montando o catálogo...",
            ProcessingStage::Editorial => "Criando foto editorial...",
            ProcessingStage::VideoGeneration => "Gerando vídeo...",
            ProcessingStage::Encoding => "Preparando download...",
            ProcessingStage::Completed => "Pronto!",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::Capture => 5,
            ProcessingStage::Treatment => 35,
            ProcessingStage::BackgroundStripping => 45,
            ProcessingStage::BoundsDetection => 50,
            ProcessingStage::Compositing => 60,
            ProcessingStage::Branding => 65,
            ProcessingStage::Editorial => 80,
            ProcessingStage::VideoGeneration => 95,
            ProcessingStage::Encoding => 98,
            ProcessingStage::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current processing stage
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self::with_description(stage, stage.description().to_string(), start_time)
    }

    #[must_use]
    pub fn with_description(stage: ProcessingStage, description: String, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
            description,
        }
    }
}

/// Trait for reporting progress during pipeline runs
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, timings: ProcessingTimings);

    /// Report an error during processing
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through `log`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log::info!("✅ Studio pipeline completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  📊 Detailed timings:");
            log::info!("    • Treatment: {}ms", timings.treatment_ms);
            log::info!("    • Stripping: {}ms", timings.stripping_ms);
            log::info!("    • Compositing: {}ms", timings.compositing_ms);
            if let Some(ms) = timings.editorial_ms {
                log::info!("    • Editorial: {}ms", ms);
            }
            if let Some(ms) = timings.video_ms {
                log::info!("    • Video: {}ms", ms);
            }
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ Error during {}: {}", stage.description(), error);
    }
}

/// Reporter that keeps every event in memory
///
/// Clones share the same buffers, so a clone can be handed to a processor
/// and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgressReporter {
    updates: Arc<Mutex<Vec<ProgressUpdate>>>,
    completions: Arc<Mutex<Vec<ProcessingTimings>>>,
    errors: Arc<Mutex<Vec<(ProcessingStage, String)>>>,
}

impl RecordingProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages reported so far, in order
    pub fn stages(&self) -> Vec<ProcessingStage> {
        self.updates
            .lock()
            .map(|u| u.iter().map(|u| u.stage).collect())
            .unwrap_or_default()
    }

    pub fn completions(&self) -> Vec<ProcessingTimings> {
        self.completions.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<(ProcessingStage, String)> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update);
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        if let Ok(mut completions) = self.completions.lock() {
            completions.push(timings);
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push((stage, error.to_string()));
        }
    }
}

/// Progress tracker that manages timing and reporting
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    /// Create a new progress tracker with the specified reporter
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Create a progress tracker with no-op reporter
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    /// Create a progress tracker with console reporter
    #[must_use]
    pub fn console(verbose: bool) -> Self {
        Self::new(Box::new(ConsoleProgressReporter::new(verbose)))
    }

    /// Report progress for a specific stage
    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    /// Report progress with custom description
    pub fn report_stage_with_description(&mut self, stage: ProcessingStage, description: String) {
        self.current_stage = Some(stage);
        self.reporter.report_progress(ProgressUpdate::with_description(
            stage,
            description,
            self.start_time,
        ));
    }

    /// Report completion with final timings
    pub fn report_completion(&self, timings: ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error against the current stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::Capture);
        self.reporter.report_error(stage, error);
    }

    /// Get the elapsed time since tracking started
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("current_stage", &self.current_stage)
            .field("elapsed_ms", &self.elapsed_ms())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STAGES: [ProcessingStage; 10] = [
        ProcessingStage::Capture,
        ProcessingStage::Treatment,
        ProcessingStage::BackgroundStripping,
        ProcessingStage::BoundsDetection,
        ProcessingStage::Compositing,
        ProcessingStage::Branding,
        ProcessingStage::Editorial,
        ProcessingStage::VideoGeneration,
        ProcessingStage::Encoding,
        ProcessingStage::Completed,
    ];

    #[test]
    fn test_processing_stage_descriptions() {
        for stage in ALL_STAGES {
            assert!(!stage.description().is_empty());
            assert!(!stage.loading_message().is_empty());
        }
    }

    #[test]
    fn test_processing_stage_progress_ordering() {
        let percentages: Vec<u8> = ALL_STAGES.iter().map(ProcessingStage::progress_percentage).collect();
        assert!(percentages.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ProcessingStage::Completed.progress_percentage(), 100);
    }

    #[test]
    fn test_progress_tracker() {
        let reporter = RecordingProgressReporter::new();
        let mut tracker = ProgressTracker::new(Box::new(reporter.clone()));

        tracker.report_stage(ProcessingStage::Capture);
        tracker.report_stage(ProcessingStage::Treatment);
        tracker.report_stage_with_description(
            ProcessingStage::Compositing,
            "Custom description".to_string(),
        );
        tracker.report_completion(ProcessingTimings::default());
        tracker.report_error("Test error message");

        assert_eq!(
            reporter.stages(),
            vec![
                ProcessingStage::Capture,
                ProcessingStage::Treatment,
                ProcessingStage::Compositing
            ]
        );
        assert_eq!(reporter.completions().len(), 1);
        assert_eq!(
            reporter.errors(),
            vec![(ProcessingStage::Compositing, "Test error message".to_string())]
        );
    }

    #[test]
    fn test_progress_tracker_convenience_constructors() {
        let tracker = ProgressTracker::no_op();
        assert!(tracker.current_stage().is_none());
        let mut tracker = ProgressTracker::console(true);
        tracker.report_stage(ProcessingStage::Branding);
        assert_eq!(tracker.current_stage(), Some(ProcessingStage::Branding));
    }

    #[test]
    fn test_trait_object_safety() {
        let reporters: Vec<Box<dyn ProgressReporter>> = vec![
            Box::new(NoOpProgressReporter),
            Box::new(ConsoleProgressReporter::new(false)),
            Box::new(RecordingProgressReporter::new()),
        ];
        for reporter in &reporters {
            reporter.report_error(ProcessingStage::Editorial, "boom");
        }
    }
}

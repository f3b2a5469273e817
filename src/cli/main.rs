//! Jewelry studio CLI
//!
//! Command-line front end over [`StudioProcessor`]: the full generative
//! pipeline, local-only compositing, photo adjustments, AI refinement,
//! text-to-image design and photo try-on.

use super::config::CliConfigBuilder;
use crate::{
    config::OutputFormat,
    generative::GeminiClient,
    imaging::BrandMark,
    processor::StudioProcessor,
    services::{ImageIOService, ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate},
    tracing_config::{events, init_cli_tracing, spans},
    types::{CapturedImage, EditParameters, ProcessingResult, ProcessingTimings, StageOutcome},
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::Instrument;

/// Jewelry photo studio
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "jewel-studio")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output directory for generated files
    #[arg(short, long, global = true, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Output format for composites
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// JPEG quality (1-100)
    #[arg(long, global = true)]
    pub jpeg_quality: Option<u8>,

    /// Prefix for downloaded file names
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// JSON configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Brand mark image (alpha or dark-on-light)
    #[arg(long, global = true, value_name = "FILE")]
    pub logo: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retouch photos through the generative API and build every catalog image
    Process {
        /// Image files or directories
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        toggles: PipelineToggles,

        /// Recurse into directories
        #[arg(short, long)]
        recursive: bool,
    },
    /// Build catalog images from already retouched photos, without network access
    Compose {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        edit: EditArgs,

        /// Skip the brand mark
        #[arg(long)]
        no_branding: bool,

        #[arg(short, long)]
        recursive: bool,
    },
    /// Apply brightness, contrast, saturation and warmth to an image
    Adjust {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        edit: EditArgs,
    },
    /// Change an image with a free-text instruction
    Refine {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "INSTRUCTION")]
        instruction: String,
    },
    /// Generate a new piece from a text description
    Design {
        #[arg(value_name = "PROMPT")]
        prompt: String,

        /// Run the full pipeline on the generated design
        #[arg(long)]
        process: bool,

        #[command(flatten)]
        toggles: PipelineToggles,
    },
    /// Place a piece of jewelry on a person photo
    TryOn {
        #[arg(value_name = "PERSON")]
        person: PathBuf,

        #[arg(value_name = "JEWEL")]
        jewel: PathBuf,
    },
}

/// Feature toggles shared by pipeline commands
#[derive(Args, Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PipelineToggles {
    /// Skip the editorial model shot and the diptych
    #[arg(long)]
    pub no_editorial: bool,

    /// Also generate a short product video
    #[arg(long)]
    pub video: bool,

    /// Skip the brand mark
    #[arg(long)]
    pub no_branding: bool,

    /// Skip catalog and diptych composites
    #[arg(long)]
    pub no_composites: bool,
}

/// Photo adjustment knobs (CSS filter percentages)
#[derive(Args, Debug, Clone, Copy)]
pub struct EditArgs {
    #[arg(long, default_value_t = 100.0)]
    pub brightness: f32,

    #[arg(long, default_value_t = 100.0)]
    pub contrast: f32,

    #[arg(long, default_value_t = 100.0)]
    pub saturation: f32,

    #[arg(long, default_value_t = 0.0)]
    pub warmth: f32,

    /// Reflection opacity (0-1)
    #[arg(long, default_value_t = 0.35)]
    pub reflection: f32,
}

impl From<EditArgs> for EditParameters {
    fn from(args: EditArgs) -> Self {
        EditParameters {
            brightness: args.brightness,
            contrast: args.contrast,
            saturation: args.saturation,
            warmth: args.warmth,
            reflection_intensity: args.reflection,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
        }
    }
}

/// Forwards pipeline stages to a spinner
struct SpinnerReporter {
    bar: ProgressBar,
    verbose: bool,
}

impl ProgressReporter for SpinnerReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_message(update.stage.loading_message());
        if self.verbose {
            self.bar.println(format!(
                "  {:>3}% {} ({}ms)",
                update.progress, update.description, update.elapsed_ms
            ));
        }
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        self.bar.set_message(ProcessingStage::Completed.loading_message());
        events::performance_metric("total", timings.total_ms);
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar.println(format!("❌ {}: {}", stage.description(), error));
    }
}

fn spinner(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} [{elapsed}] {prefix} {msg}") {
        bar.set_style(style);
    }
    bar.set_prefix(prefix.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let _span = spans::session(&session_id, command_name(&cli.command)).entered();

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let start_time = Instant::now();

    let written = match &cli.command {
        Command::Process {
            inputs, recursive, ..
        } => {
            let files = collect_inputs(inputs, *recursive)?;
            let mut processor = build_processor(&cli, config, true)?;
            process_files(&cli, &mut processor, &files).await?
        }
        Command::Compose {
            inputs,
            edit,
            recursive,
            ..
        } => {
            let files = collect_inputs(inputs, *recursive)?;
            let mut processor = build_processor(&cli, config, false)?;
            compose_files(&cli, &mut processor, &files, &EditParameters::from(*edit))?
        }
        Command::Adjust { input, edit } => {
            let processor = build_processor(&cli, config, false)?;
            let image = ImageIOService::load_image(input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let adjusted = processor.adjust(&image, &EditParameters::from(*edit));
            save_image(&cli, &processor, "adjusted", &adjusted, None)?;
            1
        }
        Command::Refine { input, instruction } => {
            let processor = build_processor(&cli, config, true)?;
            let image = ImageIOService::load_image(input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let bar = spinner("refine");
            bar.set_message("Refinando peça...");
            let refined = processor.refine(&image, instruction).await;
            bar.finish_and_clear();
            let refined = refined.context("Refinement failed")?;
            save_image(&cli, &processor, "refined", &refined, None)?;
            1
        }
        Command::Design {
            prompt, process, ..
        } => {
            let mut processor = build_processor(&cli, config, true)?;
            let bar = spinner("design");
            bar.set_message("Gerando Ativo Digital...");
            let design = processor.create_from_prompt(prompt).await;
            bar.finish_and_clear();
            let design = design.context("Design generation failed")?;
            let path = save_bytes(&cli, &processor, "design", "png", &design.bytes)?;
            if *process {
                1 + process_capture(&cli, &mut processor, &design, &path).await?
            } else {
                1
            }
        }
        Command::TryOn { person, jewel } => {
            let processor = build_processor(&cli, config, true)?;
            let person = ImageIOService::load_captured(person)
                .with_context(|| format!("Failed to load {}", person.display()))?;
            let jewel = ImageIOService::load_captured(jewel)
                .with_context(|| format!("Failed to load {}", jewel.display()))?;
            let bar = spinner("try-on");
            bar.set_message("Provando a joia...");
            let result = processor.virtual_try_on(&person, &jewel).await;
            bar.finish_and_clear();
            let result = result.context("Try-on failed")?;
            save_image(&cli, &processor, "try-on", &result, None)?;
            1
        }
    };

    info!(
        "Wrote {} file(s) to {} in {:.2}s",
        written,
        cli.output.display(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Process { .. } => "process",
        Command::Compose { .. } => "compose",
        Command::Adjust { .. } => "adjust",
        Command::Refine { .. } => "refine",
        Command::Design { .. } => "design",
        Command::TryOn { .. } => "try-on",
    }
}

/// Build a processor; local commands get a backend that is never called
fn build_processor(
    cli: &Cli,
    config: crate::config::StudioConfig,
    needs_network: bool,
) -> Result<StudioProcessor> {
    let backend: Arc<dyn crate::generative::GenerativeBackend> = if needs_network {
        Arc::new(GeminiClient::new(config.api.clone()).context("Failed to create API client")?)
    } else {
        Arc::new(OfflineBackend)
    };

    let mut builder = StudioProcessor::builder(config, backend);
    if let Some(logo) = &cli.logo {
        let image = ImageIOService::load_image(logo)
            .with_context(|| format!("Failed to load logo {}", logo.display()))?;
        builder = builder.brand_mark(BrandMark::from_image(&image).context("Invalid logo")?);
    }
    builder.build().context("Failed to create studio processor")
}

/// Backend for commands that must not reach the network
struct OfflineBackend;

#[async_trait::async_trait]
impl crate::generative::GenerativeBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(
        &self,
        _request: &crate::generative::GenerativeRequest,
    ) -> crate::Result<crate::generative::GenerativeResponse> {
        Err(crate::StudioError::generation("network calls are disabled for this command"))
    }
}

fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in inputs {
        if path.is_file() {
            if ImageIOService::is_supported_format(path) {
                files.push(path.clone());
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let depth = if recursive { usize::MAX } else { 1 };
            files.extend(
                walkdir::WalkDir::new(path)
                    .max_depth(depth)
                    .into_iter()
                    .filter_map(std::result::Result::ok)
                    .filter(|e| e.file_type().is_file())
                    .map(walkdir::DirEntry::into_path)
                    .filter(|p| ImageIOService::is_supported_format(p)),
            );
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }
    files.sort();
    if files.is_empty() {
        anyhow::bail!("No supported images found in the provided inputs");
    }
    info!("Found {} image(s) to process", files.len());
    Ok(files)
}

async fn process_files(cli: &Cli, processor: &mut StudioProcessor, files: &[PathBuf]) -> Result<usize> {
    let mut written = 0;
    let mut failed = 0;
    for path in files {
        let captured = match ImageIOService::load_captured(path) {
            Ok(captured) => captured,
            Err(e) => {
                events::error_with_context(&e, &path.display().to_string());
                failed += 1;
                continue;
            }
        };
        match process_capture(cli, processor, &captured, path)
            .instrument(spans::file_processing(path))
            .await
        {
            Ok(count) => written += count,
            Err(e) => {
                warn!("{}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        warn!("{failed} file(s) failed");
        if written == 0 {
            anyhow::bail!("All inputs failed");
        }
    }
    Ok(written)
}

async fn process_capture(
    cli: &Cli,
    processor: &mut StudioProcessor,
    captured: &CapturedImage,
    path: &Path,
) -> Result<usize> {
    let label = path
        .file_name()
        .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().to_string());
    let bar = spinner(&label);
    bar.set_message("Iniciando Tratamento de Luxo...");
    processor.set_progress_tracker(ProgressTracker::new(Box::new(SpinnerReporter {
        bar: bar.clone(),
        verbose: cli.verbose > 0,
    })));

    let result = processor.process_capture(captured).await;
    bar.finish_and_clear();
    let result = result.with_context(|| format!("Failed to process {}", path.display()))?;

    report_partial(&result);
    save_result(cli, processor, &result)
}

fn compose_files(
    cli: &Cli,
    processor: &mut StudioProcessor,
    files: &[PathBuf],
    params: &EditParameters,
) -> Result<usize> {
    let mut written = 0;
    for path in files {
        let _span = spans::file_processing(path).entered();
        let image = ImageIOService::load_image(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let result = processor
            .compose_edited(&image, Some(params))
            .with_context(|| format!("Failed to compose {}", path.display()))?;
        written += save_result(cli, processor, &result)?;
    }
    Ok(written)
}

fn report_partial(result: &ProcessingResult) {
    for (name, message) in [
        ("editorial", failure(&result.editorial)),
        ("composite", failure(&result.composite)),
    ] {
        if let Some(message) = message {
            events::warning_with_recommendation(
                &format!("{name} unavailable: {message}"),
                "the catalog images were still saved; retry later for the rest",
            );
        }
    }
    if let StageOutcome::Failed(message) = &result.video {
        events::warning_with_recommendation(&format!("video unavailable: {message}"), "retry with --video");
    }
}

fn failure<T>(outcome: &StageOutcome<T>) -> Option<&str> {
    match outcome {
        StageOutcome::Failed(message) => Some(message),
        _ => None,
    }
}

fn save_result(cli: &Cli, processor: &StudioProcessor, result: &ProcessingResult) -> Result<usize> {
    let parts = result.ready_parts();
    let _span = spans::export(&cli.output, parts.len()).entered();
    let mut written = 0;

    for (kind, outcome, format) in [
        ("treated", &result.treated, None),
        ("cutout", &result.cutout, Some(OutputFormat::Png)),
        ("clean", &result.clean, None),
        ("branded", &result.branded, None),
        ("editorial", &result.editorial, None),
        ("composite", &result.composite, None),
    ] {
        if let Some(image) = outcome.ready() {
            save_image(cli, processor, kind, image, format)?;
            written += 1;
        }
    }
    if let Some(video) = result.video.ready() {
        save_bytes(cli, processor, "video", "mp4", video)?;
        written += 1;
    }
    if let Some(classification) = &result.classification {
        info!(
            "Classified as {} ({}), material: {}",
            classification.category,
            classification.gender.as_str(),
            classification.material.as_deref().unwrap_or("-")
        );
    }
    Ok(written)
}

fn save_image(
    cli: &Cli,
    processor: &StudioProcessor,
    kind: &str,
    image: &image::DynamicImage,
    format: Option<OutputFormat>,
) -> Result<PathBuf> {
    let config = processor.config();
    let path = ImageIOService::save_download(
        &cli.output,
        &config.download_prefix,
        kind,
        image,
        format.unwrap_or(config.output_format),
        config.jpeg_quality,
    )
    .with_context(|| format!("Failed to save {kind}"))?;
    events::part_saved(kind, &path);
    Ok(path)
}

fn save_bytes(
    cli: &Cli,
    processor: &StudioProcessor,
    kind: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<PathBuf> {
    let path = ImageIOService::save_download_bytes(
        &cli.output,
        &processor.config().download_prefix,
        kind,
        extension,
        bytes,
    )
    .with_context(|| format!("Failed to save {kind}"))?;
    events::part_saved(kind, &path);
    Ok(path)
}

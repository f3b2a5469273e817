//! Tracing subscriber setup for the CLI
//!
//! The library only emits events; installing a subscriber is left to the
//! binary, which calls [`init_cli_tracing`] or builds a [`TracingConfig`].

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Colored compact lines (default)
    Console,
    /// Plain compact lines for CI logs
    Compact,
    /// One JSON object per event
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Where events go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    Console,
    /// Append to a file next to the console output
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
}

/// Keeps background writers alive; drop it only at process exit
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// `-v` count
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Overrides `verbosity` when set
    pub env_filter: Option<String>,
    /// Logged once at startup for correlation
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Filter directive for the verbosity level
    ///
    /// Level 0 keeps HTTP client chatter quiet; higher levels open everything.
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info,reqwest=warn,hyper=warn",
            1 => "debug,hyper=info",
            _ => "trace",
        }
    }

    fn filter(&self) -> anyhow::Result<EnvFilter> {
        let directive = self
            .env_filter
            .as_deref()
            .unwrap_or_else(|| self.verbosity_to_filter());
        Ok(EnvFilter::try_new(directive)?)
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        let registry = Registry::default().with(self.filter()?);
        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();

        let console = match self.format {
            TracingFormat::Console => fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .compact()
                .boxed(),
            TracingFormat::Compact => fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .compact()
                .boxed(),
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
        };

        match &self.output {
            TracingOutput::Console => registry.with(console).try_init()?,
            #[cfg(feature = "tracing-files")]
            TracingOutput::File(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new("."));
                let name = path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("jewel-studio.log"));
                let (writer, file_guard) =
                    tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
                guard._file = Some(file_guard);
                let file_layer = fmt::layer().with_ansi(false).with_writer(writer).compact();
                registry.with(console).with(file_layer).try_init()?;
            }
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "💎 Studio session started");
        }
        Ok(guard)
    }
}

/// Console tracing with a fresh session id
///
/// # Errors
/// - See [`TracingConfig::init`]
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<TracingGuard> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()
}

/// Span helpers for CLI operations
pub mod spans {
    use tracing::{Level, Span};

    /// Whole CLI invocation
    pub fn session(session_id: &str, command: &str) -> Span {
        tracing::span!(Level::INFO, "session", session_id = %session_id, command = %command)
    }

    /// One input file through the pipeline
    pub fn file_processing(path: &std::path::Path) -> Span {
        tracing::span!(Level::INFO, "file_processing", path = %path.display())
    }

    /// Writing derived parts to disk
    pub fn export(directory: &std::path::Path, parts: usize) -> Span {
        tracing::span!(Level::DEBUG, "export", directory = %directory.display(), parts)
    }
}

/// Event helpers for user-facing CLI output
pub mod events {
    use tracing::{debug, error, info, warn};

    pub fn progress(message: &str, emoji: &str) {
        info!("{} {}", emoji, message);
    }

    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!(error = %error, context = %context, "❌ Operation failed");
    }

    pub fn warning_with_recommendation(message: &str, recommendation: &str) {
        warn!(message = %message, recommendation = %recommendation, "⚠️  Warning");
    }

    pub fn part_saved(kind: &str, path: &std::path::Path) {
        info!(kind = %kind, path = %path.display(), "💾 Saved");
    }

    pub fn performance_metric(operation: &str, duration_ms: u64) {
        debug!(operation = %operation, duration_ms, "⏱️  Timing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        let level = |v| TracingConfig::new().with_verbosity(v).verbosity_to_filter();
        assert_eq!(level(0), "info,reqwest=warn,hyper=warn");
        assert_eq!(level(1), "debug,hyper=info");
        assert_eq!(level(2), "trace");
        assert_eq!(level(9), "trace");
    }

    #[test]
    fn test_env_filter_overrides_verbosity() {
        let config = TracingConfig::new().with_verbosity(2).with_env_filter("jewel_studio=debug");
        assert!(config.filter().is_ok());
        assert!(TracingConfig::new().with_env_filter("jewel_studio=loud").filter().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.format, TracingFormat::Console);
        assert_eq!(config.output, TracingOutput::Console);
        assert!(config.session_id.is_none());
    }
}

//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, Command, PipelineToggles};
use crate::config::StudioConfig;
use anyhow::{Context, Result};

/// Convert CLI arguments to a [`StudioConfig`]
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults), then apply flags on top
    pub(crate) fn from_cli(cli: &Cli) -> Result<StudioConfig> {
        let mut config = match &cli.config {
            Some(path) => StudioConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => StudioConfig::default(),
        };

        if let Some(format) = cli.format {
            config.output_format = format.into();
        }
        if let Some(quality) = cli.jpeg_quality {
            config.jpeg_quality = quality.clamp(1, 100);
        }
        if let Some(prefix) = &cli.prefix {
            config.download_prefix.clone_from(prefix);
        }

        match &cli.command {
            Command::Process { toggles, .. } | Command::Design { toggles, .. } => {
                Self::apply_toggles(&mut config, *toggles);
            }
            Command::Compose { no_branding, .. } => {
                config.editorial = false;
                config.video = false;
                if *no_branding {
                    config.branding.enabled = false;
                }
            }
            Command::Adjust { .. } | Command::Refine { .. } | Command::TryOn { .. } => {}
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn apply_toggles(config: &mut StudioConfig, toggles: PipelineToggles) {
        if toggles.no_editorial {
            config.editorial = false;
        }
        if toggles.video {
            config.video = true;
        }
        if toggles.no_branding {
            config.branding.enabled = false;
        }
        if toggles.no_composites {
            config.composites = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use clap::Parser;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "jewel-studio",
            "process",
            "ring.jpg",
            "--no-branding",
            "--video",
            "--format",
            "jpeg",
            "--jpeg-quality",
            "0",
            "--prefix",
            "loja",
        ])
        .unwrap();
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert!(!config.branding.enabled);
        assert!(config.video);
        assert!(config.editorial);
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.download_prefix, "loja");
    }

    #[test]
    fn test_compose_never_enables_network_parts() {
        let cli = Cli::try_parse_from(["jewel-studio", "compose", "treated.png"]).unwrap();
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert!(!config.editorial);
        assert!(!config.video);
        assert!(config.branding.enabled);
    }

    #[test]
    fn test_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(&path, r#"{"fill_fraction": 0.8, "editorial": false}"#).unwrap();
        let cli = Cli::try_parse_from([
            "jewel-studio",
            "process",
            "ring.jpg",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert!((config.fill_fraction - 0.8).abs() < f32::EPSILON);
        assert!(!config.editorial);
    }
}

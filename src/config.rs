//! Configuration types for studio pipeline operations

use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variables consulted for the API key, in order
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Output image format options for downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, flattened onto white)
    Jpeg,
}

/// Mirror reflection drawn beneath catalog products
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    pub enabled: bool,
    /// Alpha multiplier at the edge touching the product (0.0-1.0)
    pub opacity: f32,
    /// Reflection height as a fraction of the product height (0.0-1.0)
    pub length_fraction: f32,
    /// Gap between product and reflection in destination pixels
    pub gap_px: u32,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: 0.35,
            length_fraction: 0.35,
            gap_px: 2,
        }
    }
}

/// Brand mark overlay settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub enabled: bool,
    /// Mean luminance above which the dark tone is used (0-255)
    pub luminance_threshold: f32,
    /// Tone used over light backgrounds
    pub dark_rgb: [u8; 3],
    /// Tone used over dark backgrounds
    pub light_rgb: [u8; 3],
    /// Mark height as a fraction of the canvas height
    pub mark_height_fraction: f32,
    /// Distance of the mark from the bottom edge as a fraction of the canvas height
    pub bottom_margin_fraction: f32,
    pub shadow_blur_sigma: f32,
    pub shadow_offset_px: i32,
    pub shadow_opacity: f32,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            luminance_threshold: 135.0,
            dark_rgb: [0x66, 0x23, 0x44],
            light_rgb: [0xfd, 0xd4, 0x9e],
            mark_height_fraction: 0.08,
            bottom_margin_fraction: 0.04,
            shadow_blur_sigma: 3.0,
            shadow_offset_px: 2,
            shadow_opacity: 0.35,
        }
    }
}

/// Generative API endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Explicit key; falls back to `API_KEY_ENV_VARS` when absent
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used for image-producing calls
    pub image_model: String,
    /// Model used for JSON classification calls
    pub text_model: String,
    /// Model used for product videos
    pub video_model: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            video_model: "veo-3.1-fast-generate-preview".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl ApiConfig {
    /// Resolve the API key from the config, then from the environment
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|k| !k.trim().is_empty()))
            })
    }
}

/// Fixed-interval polling of long-running video generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            max_attempts: 60,
        }
    }
}

/// Configuration for the studio pipeline
///
/// One pipeline with toggles for editorial, video, composites and branding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Lowest channel value counted as studio background (all of R, G, B)
    pub background_threshold: u8,

    /// Alpha at or below this value is treated as noise by the bounds finder
    pub alpha_noise_threshold: u8,

    /// Fraction of the envelope the product may fill (0.5-1.0)
    pub fill_fraction: f32,

    /// Catalog canvas size (width, height)
    pub catalog_size: (u32, u32),

    /// Product + editorial side-by-side canvas size (width, height)
    pub diptych_size: (u32, u32),

    pub reflection: ReflectionConfig,

    pub branding: BrandingConfig,

    /// Generate the editorial model shot after the treatment
    pub editorial: bool,

    /// Generate a product video after the treatment
    pub video: bool,

    /// Render local composites (catalog, diptych)
    pub composites: bool,

    /// Source pixels with every channel at or above this stay white during adjustments
    pub adjust_protect_threshold: u8,

    pub output_format: OutputFormat,

    /// JPEG quality (1-100, only used for JPEG output)
    pub jpeg_quality: u8,

    /// Prefix for downloaded file names
    pub download_prefix: String,

    pub api: ApiConfig,

    pub video_poll: PollConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            background_threshold: 250,
            alpha_noise_threshold: 10,
            fill_fraction: 0.9,
            catalog_size: (1200, 1200),
            diptych_size: (2000, 1250),
            reflection: ReflectionConfig::default(),
            branding: BrandingConfig::default(),
            editorial: true,
            video: false,
            composites: true,
            adjust_protect_threshold: 235,
            output_format: OutputFormat::default(),
            jpeg_quality: 95,
            download_prefix: "studio".to_string(),
            api: ApiConfig::default(),
            video_poll: PollConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    /// ```rust
    /// use jewel_studio::StudioConfig;
    ///
    /// let config = StudioConfig::builder()
    ///     .background_threshold(248)
    ///     .editorial(false)
    ///     .build()
    ///     .unwrap();
    /// assert!(!config.editorial);
    /// ```
    #[must_use]
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder::default()
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StudioError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - fill fraction outside 0.5-1.0
    /// - background threshold below 200 (would eat the product)
    /// - reflection or branding fractions outside 0.0-1.0
    /// - zero-sized canvases, JPEG quality of 0, zero poll attempts
    pub fn validate(&self) -> Result<()> {
        if !(0.5..=1.0).contains(&self.fill_fraction) {
            return Err(StudioError::config_value_error(
                "fill fraction",
                self.fill_fraction,
                "0.5-1.0",
                Some(0.9),
            ));
        }

        if self.background_threshold < 200 {
            return Err(StudioError::config_value_error(
                "background threshold",
                self.background_threshold,
                "200-255",
                Some(250),
            ));
        }

        for (name, value) in [
            ("reflection opacity", self.reflection.opacity),
            ("reflection length fraction", self.reflection.length_fraction),
            ("mark height fraction", self.branding.mark_height_fraction),
            ("mark bottom margin fraction", self.branding.bottom_margin_fraction),
            ("shadow opacity", self.branding.shadow_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(StudioError::config_value_error(name, value, "0.0-1.0", None));
            }
        }

        if !(0.0..=255.0).contains(&self.branding.luminance_threshold) {
            return Err(StudioError::config_value_error(
                "luminance threshold",
                self.branding.luminance_threshold,
                "0-255",
                Some(135.0),
            ));
        }

        for (name, (w, h)) in [
            ("catalog size", self.catalog_size),
            ("diptych size", self.diptych_size),
        ] {
            if w == 0 || h == 0 {
                return Err(StudioError::invalid_config(format!(
                    "{} must be non-zero, got {}x{}",
                    name, w, h
                )));
            }
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(StudioError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "1-100",
                Some(95),
            ));
        }

        if self.video_poll.max_attempts == 0 {
            return Err(StudioError::invalid_config(
                "video poll max_attempts must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Builder for `StudioConfig`
#[derive(Debug, Default)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    #[must_use]
    pub fn background_threshold(mut self, threshold: u8) -> Self {
        self.config.background_threshold = threshold;
        self
    }

    #[must_use]
    pub fn alpha_noise_threshold(mut self, threshold: u8) -> Self {
        self.config.alpha_noise_threshold = threshold;
        self
    }

    #[must_use]
    pub fn fill_fraction(mut self, fraction: f32) -> Self {
        self.config.fill_fraction = fraction;
        self
    }

    #[must_use]
    pub fn catalog_size(mut self, width: u32, height: u32) -> Self {
        self.config.catalog_size = (width, height);
        self
    }

    #[must_use]
    pub fn diptych_size(mut self, width: u32, height: u32) -> Self {
        self.config.diptych_size = (width, height);
        self
    }

    #[must_use]
    pub fn reflection(mut self, reflection: ReflectionConfig) -> Self {
        self.config.reflection = reflection;
        self
    }

    #[must_use]
    pub fn branding(mut self, branding: BrandingConfig) -> Self {
        self.config.branding = branding;
        self
    }

    /// Toggle the brand mark without touching the rest of the branding settings
    #[must_use]
    pub fn branding_enabled(mut self, enabled: bool) -> Self {
        self.config.branding.enabled = enabled;
        self
    }

    #[must_use]
    pub fn editorial(mut self, enabled: bool) -> Self {
        self.config.editorial = enabled;
        self
    }

    #[must_use]
    pub fn video(mut self, enabled: bool) -> Self {
        self.config.video = enabled;
        self
    }

    #[must_use]
    pub fn composites(mut self, enabled: bool) -> Self {
        self.config.composites = enabled;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set JPEG quality (clamped to 1-100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn download_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.download_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.config.api = api;
        self
    }

    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.api.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn video_poll(mut self, poll: PollConfig) -> Self {
        self.config.video_poll = poll;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<StudioConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.background_threshold, 250);
        assert_eq!(config.alpha_noise_threshold, 10);
        assert!(config.editorial);
        assert!(!config.video);
    }

    #[test]
    fn test_builder_chain() {
        let config = StudioConfig::builder()
            .fill_fraction(0.8)
            .branding_enabled(false)
            .video(true)
            .jpeg_quality(0)
            .build()
            .unwrap();
        assert!((config.fill_fraction - 0.8).abs() < f32::EPSILON);
        assert!(!config.branding.enabled);
        assert!(config.video);
        assert_eq!(config.jpeg_quality, 1);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let err = StudioConfig::builder().fill_fraction(1.5).build().unwrap_err();
        assert!(err.to_string().contains("fill fraction"));

        let err = StudioConfig::builder()
            .background_threshold(120)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("background threshold"));

        let mut config = StudioConfig::default();
        config.reflection.opacity = 1.2;
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.catalog_size = (0, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StudioConfig =
            serde_json::from_str(r#"{"editorial": false, "branding": {"enabled": false}}"#)
                .unwrap();
        assert!(!config.editorial);
        assert!(!config.branding.enabled);
        assert!((config.branding.luminance_threshold - 135.0).abs() < f32::EPSILON);
        assert_eq!(config.catalog_size, (1200, 1200));
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let config = StudioConfig::builder().api_key("secret").build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert_eq!(config.api.resolve_api_key().as_deref(), Some("secret"));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(&path, r#"{"fill_fraction": 0.85, "video": true}"#).unwrap();
        let config = StudioConfig::from_json_file(&path).unwrap();
        assert!(config.video);

        let missing = StudioConfig::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(StudioError::Io(_))));
    }
}

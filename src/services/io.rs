//! Image I/O operations service
//!
//! File access stays here so the pipeline itself never touches the
//! filesystem; it only ever sees decoded rasters and encoded bytes.

use crate::{
    config::OutputFormat,
    error::{Result, StudioError},
    services::format::OutputFormatHandler,
    types::{CaptureSource, CapturedImage},
};
use chrono::{DateTime, Local, TimeZone};
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// The container is detected from content, so wrong extensions still load.
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)
            .map_err(|e| StudioError::file_io_error("read image file", path_ref, &e))?;

        image::load_from_memory(&data).map_err(|e| {
            StudioError::processing_stage_error(
                "image loading",
                &e.to_string(),
                Some(&format!("path: {}, size: {} bytes", path_ref.display(), data.len())),
            )
        })
    }

    /// Read an uploaded photo as a captured image
    pub fn load_captured<P: AsRef<Path>>(path: P) -> Result<CapturedImage> {
        let path_ref = path.as_ref();
        let data = std::fs::read(path_ref)
            .map_err(|e| StudioError::file_io_error("read image file", path_ref, &e))?;
        log::debug!("Loaded {} ({} bytes)", path_ref.display(), data.len());
        CapturedImage::from_encoded(data, CaptureSource::Upload)
    }

    /// Decode an image from bytes
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| StudioError::processing(format!("Failed to decode image from bytes: {e}")))
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp"))
    }

    /// Encode and write an image, creating parent directories as needed
    pub fn save_image<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let bytes = OutputFormatHandler::encode(image, format, quality)?;
        Self::write_bytes(path, &bytes)
    }

    /// Write raw bytes, creating parent directories as needed
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StudioError::file_io_error("create output directory", parent, &e))?;
        }
        std::fs::write(path_ref, bytes)
            .map_err(|e| StudioError::file_io_error("write download", path_ref, &e))
    }

    /// Download file name: `<prefix>-<kind>-<YYYYmmdd-HHMMSS>.<ext>`
    ///
    /// # Examples
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use jewel_studio::services::ImageIOService;
    ///
    /// let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
    /// assert_eq!(
    ///     ImageIOService::download_file_name("studio", "branded", "png", &at),
    ///     "studio-branded-20250309-140507.png"
    /// );
    /// ```
    #[must_use]
    pub fn download_file_name<Tz: TimeZone>(
        prefix: &str,
        kind: &str,
        extension: &str,
        at: &DateTime<Tz>,
    ) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!(
            "{}-{}-{}.{}",
            sanitize(prefix),
            sanitize(kind),
            at.format("%Y%m%d-%H%M%S"),
            extension
        )
    }

    /// Save a derived image into `dir` under a download file name
    ///
    /// Existing files are never overwritten; a numeric suffix is added instead.
    pub fn save_download<P: AsRef<Path>>(
        dir: P,
        prefix: &str,
        kind: &str,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<PathBuf> {
        let bytes = OutputFormatHandler::encode(image, format, quality)?;
        Self::save_download_bytes(dir, prefix, kind, OutputFormatHandler::get_extension(format), &bytes)
    }

    /// Save already-encoded bytes (videos, captures) under a download file name
    pub fn save_download_bytes<P: AsRef<Path>>(
        dir: P,
        prefix: &str,
        kind: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let name = Self::download_file_name(prefix, kind, extension, &Local::now());
        let path = unique_path(dir.as_ref(), &name);
        Self::write_bytes(&path, bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

fn sanitize(part: &str) -> String {
    let cleaned: String = part
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    (2..)
        .map(|n| dir.join(format!("{stem}-{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

//! Brand mark overlay with luminance-driven tone selection

use crate::{
    config::BrandingConfig,
    error::{Result, StudioError},
    types::Rect,
};
use image::{imageops, DynamicImage, GrayImage, Luma, RgbaImage};
use imageproc::{drawing::draw_polygon_mut, filter::gaussian_blur_f32, point::Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Brand tone chosen for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandTone {
    /// Used over light backgrounds
    Dark,
    /// Used over dark backgrounds
    Light,
}

impl BrandTone {
    /// Pick the tone contrasting with a region of the given mean luminance
    #[must_use]
    pub fn for_luminance(luminance: f32, threshold: f32) -> Self {
        if luminance > threshold {
            Self::Dark
        } else {
            Self::Light
        }
    }

    #[must_use]
    pub fn rgb(&self, config: &BrandingConfig) -> [u8; 3] {
        match self {
            Self::Dark => config.dark_rgb,
            Self::Light => config.light_rgb,
        }
    }
}

impl fmt::Display for BrandTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dark => write!(f, "dark"),
            Self::Light => write!(f, "light"),
        }
    }
}

/// Mean Rec. 601 luminance of `region`, `None` for an empty region
#[must_use]
pub fn mean_luminance(image: &RgbaImage, region: Rect) -> Option<f32> {
    let region = region.clamp_to(image.width(), image.height());
    if region.is_empty() {
        return None;
    }
    let mut sum = 0.0f64;
    for y in region.y..region.bottom() {
        for x in region.x..region.right() {
            let [r, g, b, _] = image.get_pixel(x, y).0;
            sum += 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        }
    }
    Some((sum / region.area() as f64) as f32)
}

/// Alpha coverage raster of the brand mark
#[derive(Debug, Clone)]
pub struct BrandMark {
    coverage: GrayImage,
}

impl BrandMark {
    /// Use a coverage mask as-is (255 = fully inked)
    pub fn from_coverage(coverage: GrayImage) -> Result<Self> {
        if coverage.width() == 0 || coverage.height() == 0 {
            return Err(StudioError::invalid_config("brand mark raster is empty"));
        }
        Ok(Self { coverage })
    }

    /// Derive coverage from a rendered logo
    ///
    /// Logos with transparency use their alpha channel; fully opaque logos
    /// are read as dark ink on a light background.
    pub fn from_image(logo: &DynamicImage) -> Result<Self> {
        let rgba = logo.to_rgba8();
        let has_transparency = rgba.pixels().any(|p| p[3] < 255);
        let coverage = if has_transparency {
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                Luma([rgba.get_pixel(x, y)[3]])
            })
        } else {
            let mut gray = logo.to_luma8();
            imageops::invert(&mut gray);
            gray
        };
        Self::from_coverage(coverage)
    }

    /// Built-in "V" monogram
    #[must_use]
    pub fn monogram() -> Self {
        let mut coverage = GrayImage::new(232, 256);
        let outline = [
            Point::new(0, 0),
            Point::new(56, 0),
            Point::new(116, 170),
            Point::new(176, 0),
            Point::new(231, 0),
            Point::new(141, 255),
            Point::new(91, 255),
        ];
        draw_polygon_mut(&mut coverage, &outline, Luma([255u8]));
        Self { coverage }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.coverage.dimensions()
    }

    /// Coverage resampled to `height`, keeping the aspect ratio
    #[must_use]
    pub fn scaled_to_height(&self, height: u32) -> GrayImage {
        let (w, h) = self.coverage.dimensions();
        let width = ((w as f32 * height as f32 / h as f32).round() as u32).max(1);
        imageops::resize(
            &self.coverage,
            width,
            height.max(1),
            imageops::FilterType::Triangle,
        )
    }
}

impl Default for BrandMark {
    fn default() -> Self {
        Self::monogram()
    }
}

/// Draws the brand mark in whichever tone contrasts with the canvas
#[derive(Debug, Clone)]
pub struct BrandingOverlay {
    config: BrandingConfig,
    mark: BrandMark,
}

impl BrandingOverlay {
    #[must_use]
    pub fn new(config: BrandingConfig, mark: BrandMark) -> Self {
        Self { config, mark }
    }

    #[must_use]
    pub fn config(&self) -> &BrandingConfig {
        &self.config
    }

    /// Pixels a catalog layout should keep free at the bottom for the mark
    #[must_use]
    pub fn reserved_height(&self, canvas_height: u32) -> u32 {
        let fraction = self.config.mark_height_fraction + 2.0 * self.config.bottom_margin_fraction;
        (canvas_height as f32 * fraction).ceil() as u32
    }

    /// Where the mark lands on a `width x height` canvas (bottom center)
    #[must_use]
    pub fn mark_rect(&self, width: u32, height: u32) -> Rect {
        let mark_h = (height as f32 * self.config.mark_height_fraction).round() as u32;
        let (mw, mh) = self.mark.dimensions();
        let mark_w = ((mw as f32 * mark_h as f32 / mh as f32).round() as u32).min(width);
        let margin = (height as f32 * self.config.bottom_margin_fraction).round() as u32;
        let y = height.saturating_sub(margin + mark_h);
        Rect::new((width - mark_w) / 2, y, mark_w, mark_h).clamp_to(width, height)
    }

    /// Brand the canvas in place at the default bottom-center position
    pub fn apply(&self, canvas: &mut RgbaImage) -> BrandTone {
        let rect = self.mark_rect(canvas.width(), canvas.height());
        self.apply_at(canvas, rect)
    }

    /// Brand the canvas in place with the mark fitted to `rect`
    ///
    /// `rect` is clipped to the canvas first. The tone is chosen from the
    /// mean luminance under it before anything is drawn. Both tones get the
    /// same soft shadow.
    pub fn apply_at(&self, canvas: &mut RgbaImage, rect: Rect) -> BrandTone {
        let rect = rect.clamp_to(canvas.width(), canvas.height());
        let luminance = mean_luminance(canvas, rect).unwrap_or(255.0);
        let tone = BrandTone::for_luminance(luminance, self.config.luminance_threshold);
        tracing::debug!(luminance, %tone, region = %rect, "brand tone selected");

        if rect.is_empty() {
            return tone;
        }

        let mut coverage = self.mark.scaled_to_height(rect.height);
        if coverage.width() > rect.width {
            coverage = imageops::resize(
                &coverage,
                rect.width,
                rect.height,
                imageops::FilterType::Triangle,
            );
        }
        let x = i64::from(rect.x) + i64::from((rect.width - coverage.width()) / 2);
        let y = i64::from(rect.y);

        let sigma = self.config.shadow_blur_sigma.max(0.0);
        let pad = (sigma * 3.0).ceil() as u32;
        let mut shadow = GrayImage::new(coverage.width() + 2 * pad, coverage.height() + 2 * pad);
        imageops::replace(&mut shadow, &coverage, i64::from(pad), i64::from(pad));
        if sigma > 0.0 {
            shadow = gaussian_blur_f32(&shadow, sigma);
        }
        let offset = i64::from(self.config.shadow_offset_px);
        blend_coverage(
            canvas,
            &shadow,
            (x - i64::from(pad) + offset, y - i64::from(pad) + offset),
            [0, 0, 0],
            self.config.shadow_opacity,
        );
        blend_coverage(canvas, &coverage, (x, y), tone.rgb(&self.config), 1.0);
        tone
    }
}

/// Source-over a solid color through a coverage mask
fn blend_coverage(
    canvas: &mut RgbaImage,
    coverage: &GrayImage,
    origin: (i64, i64),
    rgb: [u8; 3],
    opacity: f32,
) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for (mx, my, cov) in coverage.enumerate_pixels() {
        let px = origin.0 + i64::from(mx);
        let py = origin.1 + i64::from(my);
        if px < 0 || py < 0 || px >= cw || py >= ch {
            continue;
        }
        let a = f32::from(cov[0]) / 255.0 * opacity;
        if a <= 0.0 {
            continue;
        }
        let dst = canvas.get_pixel_mut(px as u32, py as u32);
        let da = f32::from(dst[3]) / 255.0;
        let out_a = a + da * (1.0 - a);
        for c in 0..3 {
            let blended = (f32::from(rgb[c]) * a + f32::from(dst[c]) * da * (1.0 - a)) / out_a;
            dst.0[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
        dst.0[3] = (out_a * 255.0).round() as u8;
    }
}

//! Core types shared by the studio pipeline

use crate::error::{RecoveryAction, Result, StudioError};
use chrono::{DateTime, Utc};
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width x height` canvas
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether `other` lies entirely inside `self`
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Smallest rectangle covering both
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Clip against a `width x height` canvas
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Rect::new(
            x,
            y,
            self.right().min(width) - x,
            self.bottom().min(height) - y,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Encoded raster mime types accepted and produced by the studio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    WebP,
}

impl ImageMime {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Parse a mime string such as `image/jpeg`
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Sniff the container format from the leading bytes
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a captured image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    Camera,
    Upload,
    Generated,
}

/// Camera orientation; the user-facing camera is mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    #[default]
    Environment,
}

/// An encoded raster produced by a capture, an upload, or a text-to-image call
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
    pub width: u32,
    pub height: u32,
    pub source: CaptureSource,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// Wrap encoded bytes, decoding once to validate them and read dimensions
    pub fn from_encoded(bytes: Vec<u8>, source: CaptureSource) -> Result<Self> {
        let mime = ImageMime::sniff(&bytes)
            .ok_or_else(|| StudioError::processing("unrecognized image container"))?;
        let decoded = image::load_from_memory(&bytes)?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(StudioError::processing("captured image is empty"));
        }
        Ok(Self {
            bytes,
            mime,
            width,
            height,
            source,
            captured_at: Utc::now(),
        })
    }

    /// Decode the raster
    pub fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }

    /// `data:` URL form used by browser surfaces and share payloads
    #[must_use]
    pub fn to_data_url(&self) -> String {
        use base64::Engine;
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Jewelry category reported by the classification call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JewelryCategory {
    Ring,
    Earring,
    Necklace,
    Bracelet,
    Pendant,
    #[serde(other)]
    Other,
}

impl JewelryCategory {
    /// Lenient parse of free-form model output ("anel", "Rings", "EARRING")
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        let v = value.trim().to_ascii_lowercase();
        if v.starts_with("ring") || v.starts_with("anel") || v.starts_with("alian") {
            Self::Ring
        } else if v.starts_with("earring") || v.starts_with("brinco") {
            Self::Earring
        } else if v.starts_with("necklace") || v.starts_with("colar") || v.starts_with("chain") {
            Self::Necklace
        } else if v.starts_with("bracelet") || v.starts_with("pulseira") || v.starts_with("bangle")
        {
            Self::Bracelet
        } else if v.starts_with("pendant") || v.starts_with("pingente") {
            Self::Pendant
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ring => "ring",
            Self::Earring => "earring",
            Self::Necklace => "necklace",
            Self::Bracelet => "bracelet",
            Self::Pendant => "pendant",
            Self::Other => "jewelry piece",
        }
    }
}

impl fmt::Display for JewelryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject gender used to cast the editorial model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubjectGender {
    Female,
    Male,
    #[serde(other)]
    Unisex,
}

impl SubjectGender {
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "female" | "feminine" | "woman" | "feminino" | "f" => Self::Female,
            "male" | "masculine" | "man" | "masculino" | "m" => Self::Male,
            _ => Self::Unisex,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Unisex => "unisex",
        }
    }
}

/// Classification metadata returned alongside the treatment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: JewelryCategory,
    pub material: Option<String>,
    pub gender: SubjectGender,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            category: JewelryCategory::Other,
            material: None,
            gender: SubjectGender::Unisex,
        }
    }
}

impl Classification {
    /// Read classification fields out of an arbitrary JSON object
    ///
    /// Missing or unrecognized fields fall back to defaults rather than failing.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let field = |name: &str| value.get(name).and_then(serde_json::Value::as_str);
        Self {
            category: field("category").map_or(JewelryCategory::Other, JewelryCategory::parse_lenient),
            material: field("material")
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(ToString::to_string),
            gender: field("gender").map_or(SubjectGender::Unisex, SubjectGender::parse_lenient),
        }
    }
}

/// Outcome of one derived part of a processing result
#[derive(Debug, Clone, Default)]
pub enum StageOutcome<T> {
    /// Not produced yet
    #[default]
    Pending,
    /// Produced and valid
    Ready(T),
    /// Attempted and failed; the rest of the record is unaffected
    Failed(String),
    /// Disabled by configuration
    Skipped,
}

impl<T> StageOutcome<T> {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for progress output
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl StageOutcome<DynamicImage> {
    /// Mark a raster ready; an empty raster stays pending
    #[must_use]
    pub fn from_image(image: DynamicImage) -> Self {
        if image.width() == 0 || image.height() == 0 {
            Self::Pending
        } else {
            Self::Ready(image)
        }
    }
}

impl StageOutcome<Vec<u8>> {
    /// Mark encoded bytes ready; empty payloads stay pending
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            Self::Pending
        } else {
            Self::Ready(bytes)
        }
    }
}

/// Per-stage wall-clock timings in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    pub treatment_ms: u64,
    pub stripping_ms: u64,
    pub compositing_ms: u64,
    pub editorial_ms: Option<u64>,
    pub video_ms: Option<u64>,
    pub total_ms: u64,
}

/// Everything derived from one captured image
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    /// Retouched image on white as returned by the API
    pub treated: StageOutcome<DynamicImage>,
    /// Transparent cut-out of the treated image, cropped to content bounds
    pub cutout: StageOutcome<DynamicImage>,
    /// Catalog composite without branding
    pub clean: StageOutcome<DynamicImage>,
    /// Catalog composite with the brand mark
    pub branded: StageOutcome<DynamicImage>,
    /// Product worn by a generated model
    pub editorial: StageOutcome<DynamicImage>,
    /// Product and editorial side by side
    pub composite: StageOutcome<DynamicImage>,
    /// Short rotating product video (encoded bytes)
    pub video: StageOutcome<Vec<u8>>,
    pub classification: Option<Classification>,
    pub timings: ProcessingTimings,
}

impl ProcessingResult {
    /// Names of all parts with a ready raster
    #[must_use]
    pub fn ready_parts(&self) -> Vec<&'static str> {
        let mut parts = Vec::new();
        for (name, ready) in [
            ("treated", self.treated.is_ready()),
            ("cutout", self.cutout.is_ready()),
            ("clean", self.clean.is_ready()),
            ("branded", self.branded.is_ready()),
            ("editorial", self.editorial.is_ready()),
            ("composite", self.composite.is_ready()),
            ("video", self.video.is_ready()),
        ] {
            if ready {
                parts.push(name);
            }
        }
        parts
    }
}

/// UI-facing processing status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Loading {
        message: String,
    },
    Success,
    Error {
        message: String,
        recovery: RecoveryAction,
    },
}

impl ProcessingState {
    #[must_use]
    pub fn loading<S: Into<String>>(message: S) -> Self {
        Self::Loading {
            message: message.into(),
        }
    }

    /// Convert an error into its displayable state
    #[must_use]
    pub fn from_error(error: &StudioError) -> Self {
        let msg = error.user_message();
        Self::Error {
            message: msg.text,
            recovery: msg.recovery,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

/// User-tunable photo adjustments
///
/// Percent values follow CSS filter semantics: 100 is identity for brightness,
/// contrast and saturation, 0 is identity for warmth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditParameters {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub warmth: f32,
    pub reflection_intensity: f32,
}

impl Default for EditParameters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            warmth: 0.0,
            reflection_intensity: 0.35,
        }
    }
}

impl EditParameters {
    pub const BRIGHTNESS_RANGE: (f32, f32) = (60.0, 150.0);
    pub const CONTRAST_RANGE: (f32, f32) = (80.0, 140.0);
    pub const SATURATION_RANGE: (f32, f32) = (0.0, 200.0);
    pub const WARMTH_RANGE: (f32, f32) = (0.0, 100.0);
    pub const REFLECTION_RANGE: (f32, f32) = (0.0, 1.0);

    /// Clamp every knob into its slider range
    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |v: f32, (lo, hi): (f32, f32)| if v.is_nan() { lo } else { v.clamp(lo, hi) };
        Self {
            brightness: clamp(self.brightness, Self::BRIGHTNESS_RANGE),
            contrast: clamp(self.contrast, Self::CONTRAST_RANGE),
            saturation: clamp(self.saturation, Self::SATURATION_RANGE),
            warmth: clamp(self.warmth, Self::WARMTH_RANGE),
            reflection_intensity: clamp(self.reflection_intensity, Self::REFLECTION_RANGE),
        }
    }

    /// Whether the color knobs are all at identity
    #[must_use]
    pub fn is_identity(&self) -> bool {
        (self.brightness - 100.0).abs() < f32::EPSILON
            && (self.contrast - 100.0).abs() < f32::EPSILON
            && (self.saturation - 100.0).abs() < f32::EPSILON
            && self.warmth.abs() < f32::EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_rect_union_and_containment() {
        let a = Rect::new(10, 10, 20, 20);
        let b = Rect::new(25, 5, 10, 10);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(10, 5, 25, 25));
        assert!(u.contains_rect(&a));
        assert!(u.contains_rect(&b));
        assert!(!a.contains_rect(&b));
        assert_eq!(Rect::new(0, 0, 0, 0).union(&a), a);
    }

    #[test]
    fn test_rect_clamp() {
        let r = Rect::new(90, 90, 20, 20).clamp_to(100, 100);
        assert_eq!(r, Rect::new(90, 90, 10, 10));
        assert!(Rect::new(150, 0, 5, 5).clamp_to(100, 100).is_empty());
    }

    #[test]
    fn test_rect_edges_saturate_at_u32_max() {
        let r = Rect::new(u32::MAX - 2, 1, 10, u32::MAX);
        assert_eq!(r.right(), u32::MAX);
        assert_eq!(r.bottom(), u32::MAX);
        assert!(r.clamp_to(100, 100).is_empty());
        assert_eq!(
            Rect::new(1, 1, u32::MAX, 2).clamp_to(4, 4),
            Rect::new(1, 1, 3, 2)
        );
        assert!(Rect::full(u32::MAX, u32::MAX).contains_rect(&r));
    }

    #[test]
    fn test_empty_raster_stays_pending() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(StageOutcome::from_image(empty).is_pending());

        let one = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255])));
        assert!(StageOutcome::from_image(one).is_ready());

        assert!(StageOutcome::from_bytes(Vec::new()).is_pending());
    }

    #[test]
    fn test_classification_from_json_is_lenient() {
        let json = serde_json::json!({"category": "Anel", "material": " Ouro 18k ", "gender": "FEMALE"});
        let c = Classification::from_json(&json);
        assert_eq!(c.category, JewelryCategory::Ring);
        assert_eq!(c.material.as_deref(), Some("Ouro 18k"));
        assert_eq!(c.gender, SubjectGender::Female);

        let c = Classification::from_json(&serde_json::json!({"category": 7}));
        assert_eq!(c, Classification::default());
    }

    #[test]
    fn test_category_serde_uses_uppercase_with_fallback() {
        let c: JewelryCategory = serde_json::from_str("\"EARRING\"").unwrap();
        assert_eq!(c, JewelryCategory::Earring);
        let c: JewelryCategory = serde_json::from_str("\"TIARA\"").unwrap();
        assert_eq!(c, JewelryCategory::Other);
    }

    #[test]
    fn test_edit_parameters_clamp_to_slider_ranges() {
        let p = EditParameters {
            brightness: 500.0,
            contrast: 10.0,
            saturation: f32::NAN,
            warmth: -4.0,
            reflection_intensity: 2.0,
        }
        .clamped();
        assert_eq!(p.brightness, 150.0);
        assert_eq!(p.contrast, 80.0);
        assert_eq!(p.saturation, 0.0);
        assert_eq!(p.warmth, 0.0);
        assert_eq!(p.reflection_intensity, 1.0);
        assert!(EditParameters::default().is_identity());
    }

    #[test]
    fn test_captured_image_round_trips_data_url_prefix() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([9, 9, 9, 255])));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let captured = CapturedImage::from_encoded(bytes, CaptureSource::Upload).unwrap();
        assert_eq!((captured.width, captured.height), (4, 3));
        assert_eq!(captured.mime, ImageMime::Png);
        assert!(captured.to_data_url().starts_with("data:image/png;base64,"));
    }
}

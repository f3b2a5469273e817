//! Output format handling service
//!
//! Keeps encoding decisions (alpha handling, extensions, quality) out of the
//! pipeline so every surface produces identical files.

use crate::{
    config::OutputFormat,
    error::{Result, StudioError},
    types::ImageMime,
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Convert an RGBA image to the pixel layout of the output format
    ///
    /// JPEG has no alpha channel, so transparent areas are flattened onto
    /// white (the studio background) instead of being dropped to black.
    ///
    /// # Examples
    /// ```rust
    /// use image::{DynamicImage, Rgba, RgbaImage};
    /// use jewel_studio::{services::OutputFormatHandler, OutputFormat};
    ///
    /// let clear = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
    /// let flat = OutputFormatHandler::convert_format(clear, OutputFormat::Jpeg);
    /// assert_eq!(flat.to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    /// ```
    #[must_use]
    pub fn convert_format(rgba_image: RgbaImage, format: OutputFormat) -> DynamicImage {
        match format {
            OutputFormat::Png => DynamicImage::ImageRgba8(rgba_image),
            OutputFormat::Jpeg => DynamicImage::ImageRgb8(Self::flatten_on_white(&rgba_image)),
        }
    }

    /// Alpha-composite onto opaque white
    #[must_use]
    pub fn flatten_on_white(rgba_image: &RgbaImage) -> RgbImage {
        RgbImage::from_fn(rgba_image.width(), rgba_image.height(), |x, y| {
            let [r, g, b, a] = rgba_image.get_pixel(x, y).0;
            let alpha = u16::from(a);
            let mix = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
            Rgb([mix(r), mix(g), mix(b)])
        })
    }

    /// File extension (without the dot)
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    #[must_use]
    pub fn mime(format: OutputFormat) -> ImageMime {
        match format {
            OutputFormat::Png => ImageMime::Png,
            OutputFormat::Jpeg => ImageMime::Jpeg,
        }
    }

    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Encode an image in the requested format
    ///
    /// `quality` only applies to JPEG and is clamped to 1-100.
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Png => Self::encode_png(image),
            OutputFormat::Jpeg => Self::encode_jpeg(image, quality),
        }
    }

    /// Lossless PNG keeping the alpha channel
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| {
                StudioError::processing_stage_error(
                    "encoding",
                    &format!("PNG encode failed: {e}"),
                    Some(&format!("{}x{}", image.width(), image.height())),
                )
            })?;
        Ok(bytes)
    }

    /// Baseline JPEG; transparent pixels are flattened onto white first
    pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let rgb = Self::flatten_on_white(&image.to_rgba8());
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
            .encode_image(&rgb)
            .map_err(|e| {
                StudioError::processing_stage_error(
                    "encoding",
                    &format!("JPEG encode failed: {e}"),
                    Some(&format!("{}x{}", rgb.width(), rgb.height())),
                )
            })?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_convert_format_png_keeps_alpha() {
        let rgba_image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]));
        let converted = OutputFormatHandler::convert_format(rgba_image, OutputFormat::Png);
        assert_eq!(converted.to_rgba8().get_pixel(0, 0)[3], 128);
    }

    #[test]
    fn test_convert_format_jpeg_flattens_on_white() {
        let rgba_image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 128]));
        let converted = OutputFormatHandler::convert_format(rgba_image, OutputFormat::Jpeg);
        match &converted {
            DynamicImage::ImageRgb8(rgb) => {
                let [r, g, b] = rgb.get_pixel(1, 1).0;
                assert_eq!((r, g, b), (127, 127, 127));
            },
            _ => panic!("Expected RGB8 image for JPEG format"),
        }
    }

    #[test]
    fn test_get_extension_and_transparency() {
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
        assert!(OutputFormatHandler::supports_transparency(OutputFormat::Png));
        assert!(!OutputFormatHandler::supports_transparency(OutputFormat::Jpeg));
        assert_eq!(OutputFormatHandler::mime(OutputFormat::Jpeg), ImageMime::Jpeg);
    }

    #[test]
    fn test_encoded_bytes_sniff_back() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([10, 200, 30, 255])));
        let png = OutputFormatHandler::encode(&img, OutputFormat::Png, 0).unwrap();
        assert_eq!(ImageMime::sniff(&png), Some(ImageMime::Png));
        let jpg = OutputFormatHandler::encode(&img, OutputFormat::Jpeg, 95).unwrap();
        assert_eq!(ImageMime::sniff(&jpg), Some(ImageMime::Jpeg));
    }
}

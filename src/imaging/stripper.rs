//! Near-white background removal by fixed threshold

use image::RgbaImage;
use tracing::instrument;

/// Make every near-white pixel fully transparent
///
/// A pixel is background when **all** of its R, G and B channels are at or
/// above `threshold`. Background pixels get alpha 0 (color channels are left
/// untouched); every other pixel is copied byte-for-byte. No feathering.
///
/// # Examples
/// ```rust
/// use image::{Rgba, RgbaImage};
/// use jewel_studio::imaging::strip_background;
///
/// let mut img = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
/// img.put_pixel(1, 0, Rgba([40, 30, 20, 255]));
/// let out = strip_background(&img, 250);
/// assert_eq!(out.get_pixel(0, 0)[3], 0);
/// assert_eq!(out.get_pixel(1, 0), &Rgba([40, 30, 20, 255]));
/// ```
#[must_use]
#[instrument(level = "debug", skip(image), fields(width = image.width(), height = image.height()))]
pub fn strip_background(image: &RgbaImage, threshold: u8) -> RgbaImage {
    let mut out = image.clone();
    let mut stripped = 0usize;
    for pixel in out.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        if r >= threshold && g >= threshold && b >= threshold {
            pixel.0[3] = 0;
            stripped += 1;
        }
    }
    tracing::debug!(stripped, threshold, "background pixels cleared");
    out
}

/// Whether a pixel would be stripped at `threshold`
#[must_use]
pub fn is_background(rgb: [u8; 3], threshold: u8) -> bool {
    rgb.iter().all(|&c| c >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_threshold_is_inclusive() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([250, 250, 250, 255]));
        img.put_pixel(1, 0, Rgba([249, 255, 255, 255]));
        img.put_pixel(2, 0, Rgba([251, 252, 253, 200]));

        let out = strip_background(&img, 250);
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(1, 0), img.get_pixel(1, 0));
        assert_eq!(out.get_pixel(2, 0)[3], 0);
    }

    #[test]
    fn test_kept_pixels_are_byte_identical() {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        for x in 0..8 {
            img.put_pixel(x, 3, Rgba([x as u8 * 30, 200, 17, 128 + x as u8]));
        }
        let out = strip_background(&img, 250);
        for (x, y, px) in out.enumerate_pixels() {
            if y == 3 {
                assert_eq!(px, img.get_pixel(x, y));
            } else {
                assert_eq!(px[3], 0);
                assert_eq!(&px.0[..3], &[255, 255, 255]);
            }
        }
    }

    #[test]
    fn test_one_channel_below_threshold_keeps_pixel() {
        assert!(!is_background([255, 255, 10], 250));
        assert!(is_background([253, 253, 253], 253));
    }

    #[test]
    fn test_empty_image() {
        let out = strip_background(&RgbaImage::new(0, 0), 250);
        assert_eq!(out.dimensions(), (0, 0));
    }
}

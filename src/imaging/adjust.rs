//! Photo adjustments with a studio-white guard
//!
//! The color chain mirrors CSS filter functions applied in order:
//! `brightness -> contrast -> saturate -> sepia`. Each step clamps to the
//! displayable range before the next one runs.

use crate::types::EditParameters;
use image::{Rgba, RgbaImage};

type Matrix3 = [[f32; 3]; 3];

fn saturate_matrix(s: f32) -> Matrix3 {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix3 {
    let k = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * k, 0.769 - 0.769 * k, 0.189 - 0.189 * k],
        [0.349 - 0.349 * k, 0.686 + 0.314 * k, 0.168 - 0.168 * k],
        [0.272 - 0.272 * k, 0.534 - 0.534 * k, 0.131 + 0.869 * k],
    ]
}

fn apply_matrix(m: &Matrix3, rgb: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (row, value) in m.iter().zip(out.iter_mut()) {
        *value = (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).clamp(0.0, 1.0);
    }
    out
}

/// Precomputed per-pixel color transform
#[derive(Debug, Clone, Copy)]
struct ColorChain {
    brightness: f32,
    contrast: f32,
    saturate: Matrix3,
    sepia: Matrix3,
}

impl ColorChain {
    fn new(params: &EditParameters) -> Self {
        Self {
            brightness: params.brightness / 100.0,
            contrast: params.contrast / 100.0,
            saturate: saturate_matrix(params.saturation / 100.0),
            sepia: sepia_matrix(params.warmth / 100.0),
        }
    }

    fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        let mut c = rgb.map(|v| (f32::from(v) / 255.0 * self.brightness).clamp(0.0, 1.0));
        c = c.map(|v| ((v - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0));
        c = apply_matrix(&self.saturate, c);
        c = apply_matrix(&self.sepia, c);
        c.map(|v| (v * 255.0).round() as u8)
    }
}

/// Apply edit parameters to a product photo
///
/// Pixels whose source channels are all at or above `protect_threshold` are
/// forced to opaque white so the studio background survives any adjustment.
/// Every output pixel is opaque. Parameters are clamped to their slider
/// ranges first.
#[must_use]
pub fn apply_adjustments(
    image: &RgbaImage,
    params: &EditParameters,
    protect_threshold: u8,
) -> RgbaImage {
    let params = params.clamped();
    let chain = ColorChain::new(&params);
    let identity = params.is_identity();

    let mut out = RgbaImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let [r, g, b, _] = src.0;
        *dst = if r >= protect_threshold && g >= protect_threshold && b >= protect_threshold {
            Rgba([255, 255, 255, 255])
        } else if identity {
            Rgba([r, g, b, 255])
        } else {
            let [r, g, b] = chain.apply([r, g, b]);
            Rgba([r, g, b, 255])
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(rgb: [u8; 3], params: &EditParameters) -> [u8; 4] {
        let img = RgbaImage::from_pixel(1, 1, Rgba([rgb[0], rgb[1], rgb[2], 255]));
        apply_adjustments(&img, params, 235).get_pixel(0, 0).0
    }

    #[test]
    fn test_identity_is_lossless() {
        assert_eq!(single([12, 130, 77], &EditParameters::default()), [12, 130, 77, 255]);
    }

    #[test]
    fn test_near_white_source_stays_white() {
        let params = EditParameters {
            brightness: 60.0,
            warmth: 100.0,
            ..EditParameters::default()
        };
        assert_eq!(single([236, 240, 250], &params), [255, 255, 255, 255]);
        // one channel below the guard goes through the filters
        assert_ne!(single([234, 240, 250], &params), [255, 255, 255, 255]);
    }

    #[test]
    fn test_brightness_and_saturation() {
        let brighter = EditParameters {
            brightness: 150.0,
            ..EditParameters::default()
        };
        assert_eq!(single([100, 100, 100], &brighter), [150, 150, 150, 255]);

        let gray = EditParameters {
            saturation: 0.0,
            ..EditParameters::default()
        };
        let [r, g, b, _] = single([200, 30, 30], &gray);
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1);
    }

    #[test]
    fn test_full_warmth_matches_sepia() {
        let warm = EditParameters {
            warmth: 100.0,
            ..EditParameters::default()
        };
        let [r, g, b, _] = single([100, 100, 100], &warm);
        assert!(r > g && g > b);
    }

    #[test]
    fn test_output_is_opaque() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([50, 60, 70, 0]));
        let out = apply_adjustments(&img, &EditParameters::default(), 235);
        assert!(out.pixels().all(|p| p[3] == 255));
    }
}

//! Tight bounding box of visible content

use crate::types::Rect;
use image::RgbaImage;

/// Result of a bounds scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBounds {
    pub rect: Rect,
    /// No pixel passed the noise threshold; `rect` is the whole canvas
    pub is_fallback: bool,
}

/// Minimal rectangle enclosing pixels with `alpha > noise_threshold`
///
/// An image without such pixels yields the full canvas with
/// `is_fallback` set. This is not an error: downstream compositing still
/// works, it just draws the whole raster.
#[must_use]
pub fn find_content_bounds(image: &RgbaImage, noise_threshold: u8) -> ContentBounds {
    let (width, height) = image.dimensions();
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] > noise_threshold {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        tracing::debug!(width, height, "no content above noise threshold, using full canvas");
        return ContentBounds {
            rect: Rect::full(width, height),
            is_fallback: true,
        };
    }

    ContentBounds {
        rect: Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1),
        is_fallback: false,
    }
}

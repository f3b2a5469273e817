//! Envelope-fitted product placement with an optional mirror reflection

use crate::{
    config::{ReflectionConfig, StudioConfig},
    error::{Result, StudioError},
    types::Rect,
};
use image::{
    imageops::{self, FilterType},
    DynamicImage, Rgba, RgbaImage,
};
use tracing::{debug, instrument};

/// Destination area the product group must stay inside
///
/// The envelope is centered on the anchor and clipped to the destination
/// canvas before any placement happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub max_width: f32,
    pub max_height: f32,
}

impl Envelope {
    #[must_use]
    pub fn new(anchor_x: f32, anchor_y: f32, max_width: f32, max_height: f32) -> Self {
        Self {
            anchor_x,
            anchor_y,
            max_width,
            max_height,
        }
    }

    /// Envelope filling `rect`, anchored at its center
    #[must_use]
    pub fn centered_in(rect: Rect) -> Self {
        Self::new(
            rect.x as f32 + rect.width as f32 / 2.0,
            rect.y as f32 + rect.height as f32 / 2.0,
            rect.width as f32,
            rect.height as f32,
        )
    }

    /// Whole-pixel envelope clipped to a `width x height` canvas
    ///
    /// Edges round inward so the integer rectangle never exceeds the
    /// requested area. `None` when nothing is left after clipping.
    #[must_use]
    pub fn to_rect(&self, width: u32, height: u32) -> Option<Rect> {
        let left = (self.anchor_x - self.max_width / 2.0).max(0.0).ceil();
        let top = (self.anchor_y - self.max_height / 2.0).max(0.0).ceil();
        let right = (self.anchor_x + self.max_width / 2.0)
            .min(width as f32)
            .floor();
        let bottom = (self.anchor_y + self.max_height / 2.0)
            .min(height as f32)
            .floor();

        if !(left.is_finite() && top.is_finite() && right.is_finite() && bottom.is_finite()) {
            return None;
        }
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Mirror reflection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionStyle {
    /// Alpha multiplier at the edge touching the product
    pub opacity: f32,
    /// Reflection height relative to the drawn product height
    pub length_fraction: f32,
    /// Gap between product and reflection in pixels
    pub gap_px: u32,
}

impl ReflectionStyle {
    /// Style from configuration, `None` when reflections are disabled or invisible
    #[must_use]
    pub fn from_config(config: &ReflectionConfig) -> Option<Self> {
        (config.enabled && config.opacity > 0.0 && config.length_fraction > 0.0).then_some(Self {
            opacity: config.opacity,
            length_fraction: config.length_fraction,
            gap_px: config.gap_px,
        })
    }

    /// Same style with the opacity replaced (user reflection slider)
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

/// Rectangles actually drawn by one composite call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawnRegions {
    /// Whole-pixel envelope after clipping to the canvas
    pub envelope: Rect,
    pub product: Rect,
    pub reflection: Option<Rect>,
}

impl DrawnRegions {
    /// Bounding box of everything drawn
    #[must_use]
    pub fn group(&self) -> Rect {
        match self.reflection {
            Some(reflection) => self.product.union(&reflection),
            None => self.product,
        }
    }
}

/// Composite layout rendered onto a fresh white canvas
#[derive(Debug, Clone, Copy)]
pub enum CompositeLayout<'a> {
    /// Product alone on white, with reflection
    Catalog,
    /// Product panel on the left, editorial photo filling the right panel
    Diptych { editorial: &'a RgbaImage },
}

/// Places bounded product content into destination envelopes
#[derive(Debug, Clone)]
pub struct Compositor {
    fill_fraction: f32,
    reflection: Option<ReflectionStyle>,
    filter: FilterType,
}

impl Compositor {
    /// Create a compositor without reflection
    ///
    /// # Errors
    /// - `fill_fraction` outside 0.5-1.0
    pub fn new(fill_fraction: f32) -> Result<Self> {
        if !(0.5..=1.0).contains(&fill_fraction) {
            return Err(StudioError::config_value_error(
                "fill fraction",
                fill_fraction,
                "0.5-1.0",
                Some(0.9),
            ));
        }
        Ok(Self {
            fill_fraction,
            reflection: None,
            filter: FilterType::Lanczos3,
        })
    }

    /// Create a compositor from pipeline configuration
    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        Ok(Self::new(config.fill_fraction)?
            .with_reflection(ReflectionStyle::from_config(&config.reflection)))
    }

    #[must_use]
    pub fn with_reflection(mut self, reflection: Option<ReflectionStyle>) -> Self {
        self.reflection = reflection;
        self
    }

    /// Resampling filter used when scaling the product
    #[must_use]
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn reflection(&self) -> Option<ReflectionStyle> {
        self.reflection
    }

    /// Compute where a `bounds`-sized product lands inside `envelope`
    ///
    /// Scale is uniform and chosen so that product, gap and reflection
    /// together fit `envelope * fill_fraction`. The group is centered in the
    /// envelope. When rounding leaves no room for the reflection it is dropped
    /// rather than letting the group overflow.
    pub fn plan(&self, bounds: Rect, envelope: Rect) -> Result<DrawnRegions> {
        if bounds.is_empty() {
            return Err(StudioError::processing_stage_error(
                "compositing",
                "content bounds are empty",
                Some(&bounds.to_string()),
            ));
        }
        if envelope.is_empty() {
            return Err(StudioError::processing_stage_error(
                "compositing",
                "envelope is empty",
                Some(&envelope.to_string()),
            ));
        }

        let avail_w = envelope.width as f32 * self.fill_fraction;
        let avail_h = envelope.height as f32 * self.fill_fraction;
        let bw = bounds.width as f32;
        let bh = bounds.height as f32;

        let (length_fraction, mut gap) = match self.reflection {
            Some(style) => (style.length_fraction, style.gap_px as f32),
            None => (0.0, 0.0),
        };
        if avail_h - gap <= 0.0 {
            gap = 0.0;
        }

        let scale = (avail_w / bw).min((avail_h - gap) / (bh * (1.0 + length_fraction)));
        if !scale.is_finite() || scale <= 0.0 {
            return Err(StudioError::processing_stage_error(
                "compositing",
                &format!("no valid scale (got {scale})"),
                Some(&envelope.to_string()),
            ));
        }

        let pw = ((bw * scale).floor() as u32).clamp(1, envelope.width);
        let ph = ((bh * scale).floor() as u32).clamp(1, envelope.height);
        let mut rh = (ph as f32 * length_fraction).floor() as u32;
        let mut gap_px = if rh > 0 { gap as u32 } else { 0 };
        if ph + gap_px + rh > envelope.height {
            rh = 0;
            gap_px = 0;
        }

        let group_h = ph + gap_px + rh;
        let gx = envelope.x + (envelope.width - pw) / 2;
        let gy = envelope.y + (envelope.height - group_h) / 2;

        let product = Rect::new(gx, gy, pw, ph);
        let reflection = (rh > 0).then(|| Rect::new(gx, gy + ph + gap_px, pw, rh));
        Ok(DrawnRegions {
            envelope,
            product,
            reflection,
        })
    }

    /// Draw the `bounds` region of `source` into `dest` inside `envelope`
    ///
    /// Product and reflection are alpha-blended over whatever `dest` already
    /// holds. Returns the drawn rectangles.
    ///
    /// An envelope overhanging `dest` is clipped first and the group is
    /// centered in what remains, so it can land off the envelope's anchor.
    /// `bounds` is clipped to `source`; nothing left after clipping is an
    /// error.
    #[instrument(level = "debug", skip(self, dest, source))]
    pub fn draw(
        &self,
        dest: &mut RgbaImage,
        source: &RgbaImage,
        bounds: Rect,
        envelope: &Envelope,
    ) -> Result<DrawnRegions> {
        let envelope_rect = envelope.to_rect(dest.width(), dest.height()).ok_or_else(|| {
            StudioError::processing_stage_error(
                "compositing",
                "envelope lies outside the destination canvas",
                Some(&format!("{}x{}", dest.width(), dest.height())),
            )
        })?;
        let bounds = bounds.clamp_to(source.width(), source.height());
        let regions = self.plan(bounds, envelope_rect)?;

        let cropped =
            imageops::crop_imm(source, bounds.x, bounds.y, bounds.width, bounds.height).to_image();
        let product = imageops::resize(
            &cropped,
            regions.product.width,
            regions.product.height,
            self.filter,
        );
        imageops::overlay(
            dest,
            &product,
            i64::from(regions.product.x),
            i64::from(regions.product.y),
        );

        if let (Some(rect), Some(style)) = (regions.reflection, self.reflection) {
            let mirrored = imageops::flip_vertical(&product);
            let mut reflection =
                imageops::crop_imm(&mirrored, 0, 0, rect.width, rect.height).to_image();
            fade_reflection(&mut reflection, style.opacity);
            imageops::overlay(dest, &reflection, i64::from(rect.x), i64::from(rect.y));
        }

        debug!(product = %regions.product, reflection = ?regions.reflection, "composited");
        Ok(regions)
    }

    /// Render a complete layout onto a new white canvas
    ///
    /// `reserved_bottom` pixels at the bottom of the product panel are kept
    /// free for the brand mark.
    pub fn render(
        &self,
        layout: CompositeLayout<'_>,
        cutout: &RgbaImage,
        bounds: Rect,
        canvas: (u32, u32),
        reserved_bottom: u32,
    ) -> Result<(RgbaImage, DrawnRegions)> {
        let (width, height) = canvas;
        let mut dest = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let usable_h = height.saturating_sub(reserved_bottom).max(height / 2);

        let product_panel = match layout {
            CompositeLayout::Catalog => Rect::new(0, 0, width, usable_h),
            CompositeLayout::Diptych { editorial } => {
                let left_w = width / 2;
                let right_w = width - left_w;
                if editorial.width() > 0 && editorial.height() > 0 {
                    let filled = DynamicImage::ImageRgba8(editorial.clone())
                        .resize_to_fill(right_w, height, self.filter)
                        .to_rgba8();
                    imageops::overlay(&mut dest, &filled, i64::from(left_w), 0);
                }
                Rect::new(0, 0, left_w, usable_h)
            },
        };

        let regions = self.draw(&mut dest, cutout, bounds, &Envelope::centered_in(product_panel))?;
        Ok((dest, regions))
    }
}

/// Linear destination-out fade: `opacity` at the top row, 0 at the bottom row
fn fade_reflection(reflection: &mut RgbaImage, opacity: f32) {
    let rows = reflection.height();
    for (_, y, pixel) in reflection.enumerate_pixels_mut() {
        let t = if rows <= 1 {
            1.0
        } else {
            y as f32 / (rows - 1) as f32
        };
        let factor = (opacity * (1.0 - t)).clamp(0.0, 1.0);
        pixel.0[3] = (f32::from(pixel.0[3]) * factor).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([20, 20, 20, 255]))
    }

    fn compositor() -> Compositor {
        Compositor::new(0.9).unwrap().with_reflection(Some(ReflectionStyle {
            opacity: 0.35,
            length_fraction: 0.35,
            gap_px: 2,
        }))
    }

    #[test]
    fn test_drawn_group_stays_inside_envelope_for_all_aspects() {
        let envelope = Envelope::new(300.0, 250.0, 400.0, 300.0);
        for (w, h) in [(100, 100), (300, 100), (100, 400)] {
            let mut dest = RgbaImage::from_pixel(600, 500, Rgba([255, 255, 255, 255]));
            let regions = compositor()
                .draw(&mut dest, &opaque(w, h), Rect::full(w, h), &envelope)
                .unwrap();
            assert_eq!(regions.envelope, Rect::new(100, 100, 400, 300));
            assert!(regions.envelope.contains_rect(&regions.group()), "{w}x{h}");
            assert!(Rect::full(600, 500).contains_rect(&regions.group()));
        }
    }

    #[test]
    fn test_envelope_clipped_by_canvas() {
        let envelope = Envelope::new(10.0, 10.0, 100.0, 100.0);
        assert_eq!(envelope.to_rect(200, 200), Some(Rect::new(0, 0, 60, 60)));
        assert_eq!(Envelope::new(500.0, 500.0, 10.0, 10.0).to_rect(200, 200), None);
    }

    #[test]
    fn test_scale_respects_fill_fraction() {
        let regions = Compositor::new(0.5)
            .unwrap()
            .plan(Rect::full(100, 100), Rect::new(0, 0, 400, 400))
            .unwrap();
        assert_eq!(regions.product, Rect::new(100, 100, 200, 200));
        assert!(regions.reflection.is_none());
    }

    #[test]
    fn test_reflection_fades_to_zero_at_far_edge() {
        let mut dest = RgbaImage::new(200, 200);
        let regions = compositor()
            .draw(
                &mut dest,
                &opaque(50, 50),
                Rect::full(50, 50),
                &Envelope::centered_in(Rect::full(200, 200)),
            )
            .unwrap();
        let r = regions.reflection.unwrap();
        assert_eq!(r.y, regions.product.bottom() + 2);

        let mid_x = r.x + r.width / 2;
        let near = dest.get_pixel(mid_x, r.y)[3];
        let far = dest.get_pixel(mid_x, r.bottom() - 1)[3];
        assert!(near > 0 && near <= 90, "near alpha {near}");
        assert_eq!(far, 0);
        // gap rows stay untouched
        assert_eq!(dest.get_pixel(mid_x, regions.product.bottom())[3], 0);
    }

    #[test]
    fn test_only_bounded_region_is_drawn() {
        let mut source = RgbaImage::new(100, 100);
        for y in 40..60 {
            for x in 10..90 {
                source.put_pixel(x, y, Rgba([200, 0, 0, 255]));
            }
        }
        let mut dest = RgbaImage::from_pixel(400, 400, Rgba([255, 255, 255, 255]));
        let regions = Compositor::new(1.0)
            .unwrap()
            .draw(
                &mut dest,
                &source,
                Rect::new(10, 40, 80, 20),
                &Envelope::centered_in(Rect::full(400, 400)),
            )
            .unwrap();
        assert_eq!(regions.product, Rect::new(0, 150, 400, 100));
        let center = dest.get_pixel(200, 200);
        assert!(center[0] > 150 && center[1] < 60);
        assert_eq!(dest.get_pixel(200, 20), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_diptych_fills_right_panel_with_editorial() {
        let editorial = RgbaImage::from_pixel(30, 60, Rgba([0, 0, 200, 255]));
        let (canvas, regions) = compositor()
            .render(
                CompositeLayout::Diptych {
                    editorial: &editorial,
                },
                &opaque(40, 40),
                Rect::full(40, 40),
                (400, 250),
                0,
            )
            .unwrap();
        assert_eq!(canvas.dimensions(), (400, 250));
        assert!(regions.group().right() <= 200);
        for (x, y) in [(399, 0), (300, 125), (201, 249)] {
            let px = canvas.get_pixel(x, y);
            assert!(px[2] > 190 && px[0] < 10, "({x},{y}) = {px:?}");
        }
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_bounds_outside_the_source_are_an_error() {
        let source = opaque(40, 40);
        let mut dest = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let envelope = Envelope::new(50.0, 50.0, 80.0, 80.0);

        let result = compositor().draw(
            &mut dest,
            &source,
            Rect::new(u32::MAX - 2, 0, 10, 10),
            &envelope,
        );

        assert!(result.is_err());
        assert!(dest.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_overhanging_bounds_are_clipped_to_the_source() {
        let source = opaque(40, 40);
        let mut dest = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let envelope = Envelope::new(50.0, 50.0, 80.0, 80.0);

        let regions = compositor()
            .draw(&mut dest, &source, Rect::new(20, 0, u32::MAX, 40), &envelope)
            .unwrap();

        assert!(regions.envelope.contains_rect(&regions.group()));
        assert!(regions.product.height > regions.product.width);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        assert!(Compositor::new(0.4).is_err());
        assert!(Compositor::new(1.01).is_err());
        let c = Compositor::new(0.9).unwrap();
        assert!(c.plan(Rect::new(0, 0, 0, 10), Rect::full(10, 10)).is_err());
        assert!(c.plan(Rect::full(10, 10), Rect::new(0, 0, 10, 0)).is_err());
    }
}

//! Try-on anchoring from hand and face landmarks
//!
//! Landmarks come from an external tracker (21-point hand model or 468-point
//! face mesh) in normalized `[0, 1]` coordinates. This module only turns them
//! into a placement pose and renders the product onto a transparent overlay
//! of the camera frame size.

use crate::{
    imaging::stripper::strip_background,
    types::{FacingMode, JewelryCategory},
};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Threshold used to cut the product out of its white studio background
pub const TRYON_BACKGROUND_THRESHOLD: u8 = 253;

const RING_MCP: usize = 13;
const RING_PIP: usize = 14;
const WRIST: usize = 0;
const INDEX_MCP: usize = 5;
const NOSE_TIP: usize = 1;
const LEFT_LOBE: usize = 454;
const RIGHT_LOBE: usize = 234;
const LEFT_EYE_OUTER: usize = 33;
const RIGHT_EYE_OUTER: usize = 263;
const CHIN: usize = 152;
const JAW_LEFT: usize = 148;

/// Normalized tracker landmark
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Which tracker feeds a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracker {
    Hand,
    FaceMesh,
}

impl Tracker {
    #[must_use]
    pub fn for_category(category: JewelryCategory) -> Self {
        match category {
            JewelryCategory::Ring | JewelryCategory::Bracelet => Self::Hand,
            _ => Self::FaceMesh,
        }
    }
}

/// Where and how to draw the product on the overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPose {
    /// Center in overlay pixels
    pub x: f32,
    pub y: f32,
    /// Rotation in radians, clockwise on screen
    pub angle: f32,
    /// Drawn product width in overlay pixels
    pub width: f32,
    /// Segment erased after drawing so the jaw line occludes the chain
    pub occluder: Option<[(f32, f32); 2]>,
}

impl PlacementPose {
    /// Pose for one frame of landmarks; `None` when tracking is lost
    #[must_use]
    pub fn from_landmarks(
        category: JewelryCategory,
        landmarks: &[Landmark],
        canvas: (u32, u32),
        facing: FacingMode,
    ) -> Option<Self> {
        let (cw, ch) = (canvas.0 as f32, canvas.1 as f32);
        let at = |i: usize| landmarks.get(i).copied();

        let pose = match category {
            JewelryCategory::Ring => {
                let mcp = at(RING_MCP)?;
                let pip = at(RING_PIP)?;
                let raw = (pip.y - mcp.y).atan2(pip.x - mcp.x) + FRAC_PI_2;
                let length = (pip.x - mcp.x).hypot(pip.y - mcp.y);
                Self {
                    x: (mcp.x + pip.x) / 2.0 * cw,
                    y: (mcp.y + pip.y) / 2.0 * ch,
                    angle: if facing == FacingMode::User { -raw } else { raw },
                    width: length * cw * 1.5,
                    occluder: None,
                }
            },
            JewelryCategory::Bracelet => {
                let wrist = at(WRIST)?;
                let index = at(INDEX_MCP)?;
                Self {
                    x: wrist.x * cw,
                    y: wrist.y * ch,
                    angle: 0.0,
                    width: (wrist.x - index.x).abs() * cw * 1.5,
                    occluder: None,
                }
            },
            JewelryCategory::Earring => {
                let nose = at(NOSE_TIP)?;
                let left = at(LEFT_LOBE)?;
                let right = at(RIGHT_LOBE)?;
                let lobe = if (right.x - nose.x).abs() > (left.x - nose.x).abs() {
                    right
                } else {
                    left
                };
                let eye_span = (at(LEFT_EYE_OUTER)?.x - at(RIGHT_EYE_OUTER)?.x).abs();
                Self {
                    x: lobe.x * cw,
                    y: lobe.y * ch,
                    angle: 0.0,
                    width: eye_span * cw * 0.35,
                    occluder: None,
                }
            },
            JewelryCategory::Necklace | JewelryCategory::Pendant | JewelryCategory::Other => {
                let chin = at(CHIN)?;
                let nose = at(NOSE_TIP)?;
                let jaw = at(JAW_LEFT)?;
                let head = (nose.x - chin.x).hypot(nose.y - chin.y);
                Self {
                    x: chin.x * cw,
                    y: (chin.y + head * 0.4) * ch,
                    angle: 0.0,
                    width: head * cw * 3.5,
                    occluder: Some([(chin.x * cw, chin.y * ch), (jaw.x * cw, jaw.y * ch)]),
                }
            },
        };

        (pose.width.is_finite() && pose.width > 0.0).then_some(pose)
    }
}

/// Renders a prepared product onto per-frame overlays
#[derive(Debug, Clone)]
pub struct TryOnRenderer {
    jewel: RgbaImage,
    category: JewelryCategory,
    facing: FacingMode,
}

impl TryOnRenderer {
    /// Prepare a product photo: near-white becomes transparent
    #[must_use]
    pub fn new(product: &RgbaImage, category: JewelryCategory, facing: FacingMode) -> Self {
        Self {
            jewel: strip_background(product, TRYON_BACKGROUND_THRESHOLD),
            category,
            facing,
        }
    }

    #[must_use]
    pub fn tracker(&self) -> Tracker {
        Tracker::for_category(self.category)
    }

    /// Overlay for one frame, `None` while not tracking
    #[must_use]
    pub fn render_frame(&self, landmarks: &[Landmark], canvas: (u32, u32)) -> Option<RgbaImage> {
        let pose = PlacementPose::from_landmarks(self.category, landmarks, canvas, self.facing)?;
        Some(self.render_pose(&pose, canvas))
    }

    /// Draw the product at `pose` onto a transparent overlay
    #[must_use]
    pub fn render_pose(&self, pose: &PlacementPose, canvas: (u32, u32)) -> RgbaImage {
        let mut overlay = RgbaImage::new(canvas.0, canvas.1);
        let (jw, jh) = self.jewel.dimensions();
        if jw == 0 || jh == 0 {
            return overlay;
        }

        let scale = pose.width / jw as f32;
        let projection = Projection::translate(pose.x, pose.y)
            * Projection::rotate(pose.angle)
            * Projection::scale(scale, scale)
            * Projection::translate(-(jw as f32) / 2.0, -(jh as f32) / 2.0);
        warp_into(
            &self.jewel,
            &projection,
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
            &mut overlay,
        );

        if let Some([from, to]) = pose.occluder {
            erase_stroke(&mut overlay, from, to, pose.width * 0.2);
        }
        overlay
    }
}

/// Clear alpha along a round-capped segment of `line_width`
fn erase_stroke(overlay: &mut RgbaImage, from: (f32, f32), to: (f32, f32), line_width: f32) {
    let radius = line_width / 2.0;
    if radius <= 0.0 {
        return;
    }
    let (w, h) = overlay.dimensions();
    let clamp_x = |v: f32| v.clamp(0.0, w as f32) as u32;
    let clamp_y = |v: f32| v.clamp(0.0, h as f32) as u32;
    let x0 = clamp_x(from.0.min(to.0) - radius);
    let x1 = clamp_x((from.0.max(to.0) + radius).ceil());
    let y0 = clamp_y(from.1.min(to.1) - radius);
    let y1 = clamp_y((from.1.max(to.1) + radius).ceil());

    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let len_sq = dx * dx + dy * dy;
    for y in y0..y1 {
        for x in x0..x1 {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let t = if len_sq > 0.0 {
                (((px - from.0) * dx + (py - from.1) * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (cx, cy) = (from.0 + t * dx, from.1 + t * dy);
            if (px - cx).hypot(py - cy) <= radius {
                overlay.get_pixel_mut(x, y).0[3] = 0;
            }
        }
    }
}

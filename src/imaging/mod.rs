//! Local pixel pipeline
//!
//! Every pass here is a pure function over `image::RgbaImage` buffers and
//! runs without network access:
//!
//! - [`stripper`]: near-white background to transparency
//! - [`bounds`]: tight alpha bounding box
//! - [`compositor`]: envelope-fitted placement with mirror reflection
//! - [`branding`]: luminance-aware brand mark with soft shadow
//! - [`adjust`]: photo adjustments that keep the studio white intact
//! - [`tryon`]: landmark anchoring for live try-on overlays

pub mod adjust;
pub mod bounds;
pub mod branding;
pub mod compositor;
pub mod stripper;
pub mod tryon;

pub use adjust::apply_adjustments;
pub use bounds::{find_content_bounds, ContentBounds};
pub use branding::{mean_luminance, BrandMark, BrandTone, BrandingOverlay};
pub use compositor::{CompositeLayout, Compositor, DrawnRegions, Envelope, ReflectionStyle};
pub use stripper::strip_background;
pub use tryon::{Landmark, PlacementPose, Tracker, TryOnRenderer};

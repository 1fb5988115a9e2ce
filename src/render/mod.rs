//! Renderers: everything that turns engine state into [`Frame`](crate::paint::Frame)s.
//!
//! - [`shape`] builds spotlight outlines.
//! - [`spotlight`] paints the dim mask with its cut-out.
//! - [`effects`] paints click ripples and keystroke labels.
//! - [`raster`] rasterizes frames into `tiny-skia` pixmaps for the native
//!   overlay windows and the terminal demo.

pub mod effects;
pub mod raster;
pub mod shape;
pub mod spotlight;

pub use effects::{EffectLayer, EffectMark, MarkKind};
pub use raster::{Canvas, LabelFont};
pub use spotlight::{EdgeGeometry, RING_STEPS, SpotlightParams, SpotlightRenderer};

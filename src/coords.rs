//! Conversions between the coordinate spaces the engine deals with.
//!
//! - **Hook space**: what the OS input hooks and display queries report.
//!   Origin at the top-left of the primary display, Y grows downwards.
//! - **Virtual-desktop space**: the engine's canonical space. Origin at the
//!   bottom-left of the primary display, Y grows upwards, spans all displays.
//! - **Surface-local space**: virtual-desktop space shifted so that one
//!   overlay surface's bottom-left corner is the origin.
//!
//! The flip between the first two always uses the height of the *primary*
//! display (topology index 0), never whichever display happens to hold focus.

use crate::geometry::{Point, Rect};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Convert a hook-space point to virtual-desktop space.
#[inline]
pub fn hook_to_virtual_desktop(point: Point, primary_height: f64) -> Point {
    Point::new(point.x, primary_height - point.y)
}

/// Convert a virtual-desktop point back to hook space.
///
/// The flip is its own inverse; this exists so call sites read in the right
/// direction.
#[inline]
pub fn virtual_desktop_to_hook(point: Point, primary_height: f64) -> Point {
    Point::new(point.x, primary_height - point.y)
}

/// Convert a hook-space rectangle (top-left anchored) to virtual-desktop
/// space (bottom-left anchored).
pub fn hook_rect_to_virtual_desktop(rect: Rect, primary_height: f64) -> Rect {
    Rect::new(
        rect.x,
        primary_height - (rect.y + rect.height),
        rect.width,
        rect.height,
    )
}

/// Convert a virtual-desktop point into the local space of a surface whose
/// bottom-left corner sits at `surface_origin`.
#[inline]
pub fn virtual_desktop_to_surface_local(point: Point, surface_origin: Point) -> Point {
    point.offset_from(surface_origin)
}

/// Convert a surface-local point back to virtual-desktop space.
#[inline]
pub fn surface_local_to_virtual_desktop(point: Point, surface_origin: Point) -> Point {
    Point::new(point.x + surface_origin.x, point.y + surface_origin.y)
}

/// The primary display height, readable from the hook thread.
///
/// The UI thread updates it after every topology rebuild; the hook thread
/// reads it when normalizing raw pointer positions. Stored as raw `f64` bits.
#[derive(Debug, Clone)]
pub struct PrimaryReference {
    height_bits: Arc<AtomicU64>,
}

impl PrimaryReference {
    pub fn new(primary_height: f64) -> Self {
        Self {
            height_bits: Arc::new(AtomicU64::new(primary_height.to_bits())),
        }
    }

    pub fn height(&self) -> f64 {
        f64::from_bits(self.height_bits.load(Ordering::Acquire))
    }

    pub fn set_height(&self, primary_height: f64) {
        self.height_bits
            .store(primary_height.to_bits(), Ordering::Release);
    }

    /// Normalize a hook-space point with the current primary height.
    pub fn normalize(&self, point: Point) -> Point {
        hook_to_virtual_desktop(point, self.height())
    }
}

impl Default for PrimaryReference {
    fn default() -> Self {
        Self::new(0.0)
    }
}

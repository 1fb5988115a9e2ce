//! Display topology and cursor queries.
//!
//! Bounds and cursor positions are reported in hook space (top-left origin,
//! Y down), exactly as the platform hands them out. The list returned by
//! [`displays`] always has the primary display at index 0, which is the
//! display every coordinate flip is anchored to.

use crate::error::Result;
use crate::geometry::{Point, Rect};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Information about a display/monitor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayInfo {
    /// Platform-specific identifier (best-effort).
    pub id: u32,
    /// Display bounds in hook space.
    pub bounds: Rect,
    /// Scale factor relative to 1.0 (96 DPI on Windows, 1x on macOS).
    pub scale_factor: f64,
    /// Refresh rate in Hz, if available.
    pub refresh_rate: Option<u32>,
    /// Whether this is the primary display.
    pub is_primary: bool,
}

impl DisplayInfo {
    /// A plain 1x display, mostly useful for synthetic topologies.
    pub fn new(id: u32, bounds: Rect, is_primary: bool) -> Self {
        Self {
            id,
            bounds,
            scale_factor: 1.0,
            refresh_rate: None,
            is_primary,
        }
    }
}

/// Move the primary display to index 0, keeping the relative order of the rest.
///
/// If no display claims to be primary the first one is promoted.
pub fn order_primary_first(displays: &mut [DisplayInfo]) {
    match displays.iter().position(|d| d.is_primary) {
        Some(index) => displays[..=index].rotate_right(1),
        None => {
            if let Some(first) = displays.first_mut() {
                first.is_primary = true;
            }
        }
    }
}

/// List all connected displays, primary first.
pub fn displays() -> Result<Vec<DisplayInfo>> {
    let mut displays = crate::platform::displays()?;
    order_primary_first(&mut displays);
    Ok(displays)
}

/// Current cursor position in hook space.
pub fn cursor_position() -> Result<Point> {
    crate::platform::cursor_position()
}

/// Source of the current display topology.
pub trait DisplayTopology {
    /// Connected displays, primary at index 0, bounds in hook space.
    fn displays(&self) -> Result<Vec<DisplayInfo>>;
}

/// Source of the current cursor position, for polling.
pub trait CursorLocator {
    /// Current cursor position in hook space.
    fn cursor_position(&self) -> Result<Point>;
}

/// The real displays and cursor, queried through the platform backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDisplays;

impl DisplayTopology for SystemDisplays {
    fn displays(&self) -> Result<Vec<DisplayInfo>> {
        displays()
    }
}

impl CursorLocator for SystemDisplays {
    fn cursor_position(&self) -> Result<Point> {
        cursor_position()
    }
}

/// A topology that only changes when told to.
///
/// Clones share the display list, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    displays: Arc<Mutex<Vec<DisplayInfo>>>,
}

impl StaticTopology {
    pub fn new(displays: Vec<DisplayInfo>) -> Self {
        let topology = Self::default();
        topology.set_displays(displays);
        topology
    }

    /// Replace the display list.
    pub fn set_displays(&self, mut displays: Vec<DisplayInfo>) {
        order_primary_first(&mut displays);
        if let Ok(mut guard) = self.displays.lock() {
            *guard = displays;
        }
    }
}

impl DisplayTopology for StaticTopology {
    fn displays(&self) -> Result<Vec<DisplayInfo>> {
        self.displays
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| crate::Error::ThreadError("topology mutex poisoned".into()))
    }
}

/// A cursor that sits wherever it was last put, counting how often it is read.
#[derive(Debug, Clone, Default)]
pub struct ManualCursor {
    position: Arc<Mutex<Point>>,
    reads: Arc<AtomicUsize>,
}

impl ManualCursor {
    pub fn new(position: Point) -> Self {
        let cursor = Self::default();
        cursor.move_to(position);
        cursor
    }

    /// Move the cursor (hook space).
    pub fn move_to(&self, position: Point) {
        if let Ok(mut guard) = self.position.lock() {
            *guard = position;
        }
    }

    /// How many times the position has been queried.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CursorLocator for ManualCursor {
    fn cursor_position(&self) -> Result<Point> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.position
            .lock()
            .map(|guard| *guard)
            .map_err(|_| crate::Error::ThreadError("cursor mutex poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(id: u32, x: f64, primary: bool) -> DisplayInfo {
        DisplayInfo::new(id, Rect::new(x, 0.0, 1920.0, 1080.0), primary)
    }

    #[test]
    fn test_primary_moves_to_front() {
        let mut list = vec![
            display(1, -1920.0, false),
            display(2, 1920.0, false),
            display(3, 0.0, true),
        ];
        order_primary_first(&mut list);
        let ids: Vec<u32> = list.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_first_display_promoted_without_primary() {
        let mut list = vec![display(7, 0.0, false), display(8, 1920.0, false)];
        order_primary_first(&mut list);
        assert!(list[0].is_primary);
        assert!(!list[1].is_primary);
    }

    #[test]
    fn test_static_topology_orders_on_set() {
        let topology = StaticTopology::new(vec![display(1, 1920.0, false), display(2, 0.0, true)]);
        let list = topology.displays().unwrap();
        assert_eq!(list[0].id, 2);
    }

    #[test]
    fn test_manual_cursor_counts_reads() {
        let cursor = ManualCursor::new(Point::new(4.0, 5.0));
        assert_eq!(cursor.cursor_position().unwrap(), Point::new(4.0, 5.0));
        cursor.move_to(Point::new(6.0, 7.0));
        assert_eq!(cursor.cursor_position().unwrap(), Point::new(6.0, 7.0));
        assert_eq!(cursor.reads(), 2);
    }
}

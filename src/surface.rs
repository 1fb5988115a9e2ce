//! Per-display overlay surfaces.
//!
//! A [`DisplaySurfaceSet`] keeps exactly one overlay surface per connected
//! display. Surfaces are never patched in place: on every topology change the
//! whole set is dropped and rebuilt, and the set's generation counter moves
//! forward so anything tied to the old surfaces can tell it is stale.
//!
//! Visibility is aggregate. [`DisplaySurfaceSet::show`] and
//! [`DisplaySurfaceSet::hide`] fade the opacity of every surface together;
//! hiding keeps the surfaces alive so showing them again is cheap.
//!
//! [`native_backend`] returns the platform's overlay windows: a borderless
//! `NSWindow` on macOS, a layered `WS_EX_TRANSPARENT` window on Windows and
//! an override-redirect ARGB window on X11. [`HeadlessBackend`] records
//! everything instead and is what the tests drive.

use crate::animation::Easing;
use crate::clock::Timestamp;
use crate::coords::hook_rect_to_virtual_desktop;
use crate::display::DisplayInfo;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::paint::Frame;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Stacking level of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceLevel {
    /// Ordinary application windows.
    Normal,
    /// Above applications, below system status surfaces.
    #[default]
    Overlay,
    /// Menus, notifications and other system-critical surfaces.
    System,
}

/// How a backend should create one overlay surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    /// Index of the display in the topology (0 is primary).
    pub display_index: usize,
    pub display_id: u32,
    /// Generation of the set this surface belongs to.
    pub generation: u64,
    /// Bounds in virtual-desktop space.
    pub bounds: Rect,
    /// Bounds as the platform reports them (top-left origin, Y down).
    pub native_bounds: Rect,
    pub scale_factor: f64,
    pub level: SurfaceLevel,
    /// Mouse input passes through to whatever is underneath.
    pub click_through: bool,
    pub transparent: bool,
}

/// A paintable, borderless overlay created by a [`SurfaceBackend`].
///
/// Dropping it destroys the native surface.
pub trait OverlaySurface {
    fn set_visible(&mut self, visible: bool);
    fn set_opacity(&mut self, opacity: f64);
    /// Replace the surface contents with `frame` (surface-local coordinates).
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

/// Creates native overlay surfaces.
pub trait SurfaceBackend {
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn OverlaySurface>>;

    /// Service the window system. Called on the UI thread every loop turn.
    fn pump(&mut self) {}

    /// Longest the event loop may sleep without calling [`pump`](Self::pump).
    fn pump_interval(&self) -> Option<Duration> {
        None
    }
}

/// The overlay windows of the current platform.
///
/// Must be called on the thread that runs the event loop (on macOS, the main
/// thread).
pub fn native_backend() -> Result<Box<dyn SurfaceBackend>> {
    Ok(Box::new(crate::platform::OverlayBackend::new()?))
}

/// One live overlay surface.
pub struct DisplaySurface {
    display_index: usize,
    display_id: u32,
    bounds: Rect,
    dirty: bool,
    target: Box<dyn OverlaySurface>,
}

impl DisplaySurface {
    pub fn display_index(&self) -> usize {
        self.display_index
    }

    pub fn display_id(&self) -> u32 {
        self.display_id
    }

    /// Bounds in virtual-desktop space.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl std::fmt::Debug for DisplaySurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplaySurface")
            .field("display_index", &self.display_index)
            .field("display_id", &self.display_id)
            .field("bounds", &self.bounds)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    from: f64,
    to: f64,
    start: Timestamp,
    duration: Duration,
    easing: Easing,
}

impl Fade {
    fn progress(&self, now: Timestamp) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (now.saturating_since(self.start).as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    fn opacity(&self, progress: f64) -> f64 {
        self.from + (self.to - self.from) * self.easing.apply(progress)
    }
}

/// All overlay surfaces, one per display.
pub struct DisplaySurfaceSet {
    backend: Box<dyn SurfaceBackend>,
    surfaces: Vec<DisplaySurface>,
    generation: u64,
    primary_height: f64,
    visible: bool,
    opacity: f64,
    fade: Option<Fade>,
}

impl DisplaySurfaceSet {
    /// An empty, hidden set. Nothing is created until the first rebuild.
    pub fn new(backend: Box<dyn SurfaceBackend>) -> Self {
        Self {
            backend,
            surfaces: Vec::new(),
            generation: 0,
            primary_height: 0.0,
            visible: false,
            opacity: 0.0,
            fade: None,
        }
    }

    /// Drop every surface and create one per display in `displays`.
    ///
    /// `displays` must have the primary first; its height becomes the
    /// reference for flipping hook-space bounds. A display whose surface
    /// cannot be created is skipped. New surfaces inherit the current
    /// visibility and opacity and start dirty. Returns how many were created.
    pub fn rebuild_for_current_topology(&mut self, displays: &[DisplayInfo]) -> usize {
        self.surfaces.clear();
        self.generation += 1;
        self.primary_height = displays.first().map_or(0.0, |d| d.bounds.height);

        for (display_index, display) in displays.iter().enumerate() {
            let config = SurfaceConfig {
                display_index,
                display_id: display.id,
                generation: self.generation,
                bounds: hook_rect_to_virtual_desktop(display.bounds, self.primary_height),
                native_bounds: display.bounds,
                scale_factor: display.scale_factor,
                level: SurfaceLevel::Overlay,
                click_through: true,
                transparent: true,
            };
            match self.backend.create_surface(&config) {
                Ok(mut target) => {
                    target.set_opacity(self.opacity);
                    target.set_visible(self.visible);
                    self.surfaces.push(DisplaySurface {
                        display_index,
                        display_id: display.id,
                        bounds: config.bounds,
                        dirty: true,
                        target,
                    });
                }
                Err(err) => log::warn!(
                    "skipping overlay for display {} ({}): {err}",
                    display.id,
                    display_index
                ),
            }
        }

        log::info!(
            "overlay surfaces rebuilt: {} of {} displays (generation {})",
            self.surfaces.len(),
            displays.len(),
            self.generation
        );
        self.surfaces.len()
    }

    /// Mark one surface dirty. Out-of-range indices are ignored.
    pub fn request_repaint(&mut self, index: usize) {
        if let Some(surface) = self.surfaces.get_mut(index) {
            surface.dirty = true;
        }
    }

    pub fn request_repaint_all(&mut self) {
        for surface in &mut self.surfaces {
            surface.dirty = true;
        }
    }

    /// Make the surfaces visible, fading opacity up to 1 over `duration`.
    pub fn show(&mut self, now: Timestamp, duration: Duration) {
        if !self.visible {
            self.visible = true;
            for surface in &mut self.surfaces {
                surface.target.set_visible(true);
            }
        }
        self.begin_fade(now, 1.0, duration, Easing::EaseOutCubic);
        self.request_repaint_all();
    }

    /// Fade opacity to 0 over `duration`, then hide. Surfaces stay alive.
    pub fn hide(&mut self, now: Timestamp, duration: Duration) {
        if !self.visible {
            return;
        }
        self.begin_fade(now, 0.0, duration, Easing::EaseInCubic);
    }

    fn begin_fade(&mut self, now: Timestamp, to: f64, duration: Duration, easing: Easing) {
        self.fade = Some(Fade {
            from: self.opacity,
            to,
            start: now,
            duration,
            easing,
        });
        self.advance(now);
    }

    /// Apply the running fade at `now`. Returns whether a fade is still running.
    pub fn advance(&mut self, now: Timestamp) -> bool {
        let Some(fade) = self.fade else {
            return false;
        };
        let progress = fade.progress(now);
        self.set_opacity(fade.opacity(progress));

        if progress < 1.0 {
            return true;
        }
        self.fade = None;
        if fade.to <= 0.0 {
            self.visible = false;
            for surface in &mut self.surfaces {
                surface.target.set_visible(false);
            }
        }
        false
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
        for surface in &mut self.surfaces {
            surface.target.set_opacity(self.opacity);
        }
    }

    /// Present a fresh frame on every dirty surface.
    ///
    /// Hidden surfaces are not painted and keep their dirty flag. Returns
    /// how many surfaces were painted.
    pub fn paint_dirty(&mut self, mut paint: impl FnMut(&DisplaySurface) -> Frame) -> usize {
        if !self.visible {
            return 0;
        }
        let mut painted = 0;
        for surface in self.surfaces.iter_mut().filter(|s| s.dirty) {
            let frame = paint(surface);
            if let Err(err) = surface.target.present(&frame) {
                log::warn!("failed to present overlay {}: {err}", surface.display_id);
            }
            surface.dirty = false;
            painted += 1;
        }
        log::trace!("painted {painted} overlay surfaces");
        painted
    }

    /// Whether the surfaces are shown (including while fading out).
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Whether a running fade ends with the surfaces hidden.
    pub fn is_fading_out(&self) -> bool {
        self.fade.is_some_and(|fade| fade.to <= 0.0)
    }

    pub fn has_dirty(&self) -> bool {
        self.visible && self.surfaces.iter().any(|s| s.dirty)
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn surfaces(&self) -> &[DisplaySurface] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Index of the surface containing `point` (virtual-desktop space).
    pub fn surface_at(&self, point: Point) -> Option<usize> {
        self.surfaces.iter().position(|s| s.bounds.contains(point))
    }

    pub fn pump(&mut self) {
        self.backend.pump();
    }

    pub fn pump_interval(&self) -> Option<Duration> {
        self.backend.pump_interval()
    }

    /// Height of the primary display at the last rebuild.
    pub fn primary_height(&self) -> f64 {
        self.primary_height
    }

    /// Bumped on every rebuild.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// State of one surface created by a [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub config: SurfaceConfig,
    pub visible: bool,
    pub opacity: f64,
    pub presents: usize,
    pub last_frame: Option<Frame>,
    pub destroyed: bool,
}

#[derive(Debug, Default)]
struct HeadlessState {
    records: Vec<SurfaceRecord>,
    refused: HashSet<u32>,
    pumps: usize,
}

/// A backend with no native surfaces that records everything done to them.
///
/// Clones share the same records, so a test can keep one handle and give
/// another to the engine.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make surface creation fail for the display with `display_id`.
    pub fn refuse_display(&self, display_id: u32) {
        self.with_state(|state| {
            state.refused.insert(display_id);
        });
    }

    /// Every surface ever created, in creation order.
    pub fn records(&self) -> Vec<SurfaceRecord> {
        self.with_state(|state| state.records.clone())
            .unwrap_or_default()
    }

    /// How many times the event loop serviced this backend.
    pub fn pumps(&self) -> usize {
        self.with_state(|state| state.pumps).unwrap_or_default()
    }

    /// Surfaces that have not been destroyed.
    pub fn live(&self) -> Vec<SurfaceRecord> {
        self.records()
            .into_iter()
            .filter(|record| !record.destroyed)
            .collect()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut HeadlessState) -> T) -> Option<T> {
        self.state.lock().ok().map(|mut guard| f(&mut guard))
    }
}

impl SurfaceBackend for HeadlessBackend {
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn OverlaySurface>> {
        let slot = self
            .with_state(|state| {
                if state.refused.contains(&config.display_id) {
                    return None;
                }
                state.records.push(SurfaceRecord {
                    config: config.clone(),
                    visible: false,
                    opacity: 0.0,
                    presents: 0,
                    last_frame: None,
                    destroyed: false,
                });
                Some(state.records.len() - 1)
            })
            .ok_or_else(|| Error::ThreadError("headless backend mutex poisoned".into()))?
            .ok_or_else(|| {
                Error::SurfaceCreation(format!("display {} refused", config.display_id))
            })?;

        Ok(Box::new(HeadlessSurface {
            backend: self.clone(),
            slot,
        }))
    }

    fn pump(&mut self) {
        self.with_state(|state| state.pumps += 1);
    }
}

struct HeadlessSurface {
    backend: HeadlessBackend,
    slot: usize,
}

impl HeadlessSurface {
    fn update(&self, f: impl FnOnce(&mut SurfaceRecord)) {
        self.backend.with_state(|state| {
            if let Some(record) = state.records.get_mut(self.slot) {
                f(record);
            }
        });
    }
}

impl OverlaySurface for HeadlessSurface {
    fn set_visible(&mut self, visible: bool) {
        self.update(|record| record.visible = visible);
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.update(|record| record.opacity = opacity);
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.update(|record| {
            record.presents += 1;
            record.last_frame = Some(frame.clone());
        });
        Ok(())
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        self.update(|record| record.destroyed = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_displays() -> Vec<DisplayInfo> {
        vec![
            DisplayInfo::new(1, Rect::new(0.0, 0.0, 1920.0, 1080.0), true),
            // Sits to the right, top-aligned, taller than the primary.
            DisplayInfo::new(2, Rect::new(1920.0, 0.0, 1280.0, 1440.0), false),
        ]
    }

    fn set_with(backend: &HeadlessBackend) -> DisplaySurfaceSet {
        DisplaySurfaceSet::new(Box::new(backend.clone()))
    }

    #[test]
    fn test_rebuild_creates_one_surface_per_display() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        assert_eq!(set.rebuild_for_current_topology(&two_displays()), 2);

        let live = backend.live();
        assert_eq!(live.len(), 2);
        assert!(live.iter().all(|r| r.config.click_through && r.config.transparent));
        assert!(live.iter().all(|r| r.config.level == SurfaceLevel::Overlay));
        assert_eq!(live[0].config.bounds, Rect::new(0.0, 0.0, 1920.0, 1080.0));
        assert_eq!(live[1].config.bounds, Rect::new(1920.0, -360.0, 1280.0, 1440.0));
        assert_eq!(live[1].config.native_bounds, Rect::new(1920.0, 0.0, 1280.0, 1440.0));
        assert_eq!(set.primary_height(), 1080.0);
    }

    #[test]
    fn test_rebuild_destroys_old_surfaces() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.rebuild_for_current_topology(&two_displays());
        let first = set.generation();

        set.rebuild_for_current_topology(&two_displays()[..1]);
        assert_eq!(set.generation(), first + 1);
        assert_eq!(backend.records().len(), 3);
        assert_eq!(backend.live().len(), 1);
        assert_eq!(backend.live()[0].config.generation, first + 1);
    }

    #[test]
    fn test_refused_display_is_skipped() {
        let backend = HeadlessBackend::new();
        backend.refuse_display(2);
        let mut set = set_with(&backend);
        assert_eq!(set.rebuild_for_current_topology(&two_displays()), 1);
        assert_eq!(set.surfaces()[0].display_id(), 1);
    }

    #[test]
    fn test_hide_fades_then_keeps_surfaces() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.rebuild_for_current_topology(&two_displays());

        set.show(Timestamp::ZERO, Duration::from_millis(100));
        assert!(set.is_visible());
        assert!(set.advance(Timestamp::from_millis(50)));
        assert!(set.opacity() > 0.5 && set.opacity() < 1.0);
        assert!(!set.advance(Timestamp::from_millis(100)));
        assert_eq!(set.opacity(), 1.0);

        set.hide(Timestamp::from_millis(200), Duration::from_millis(100));
        assert!(set.advance(Timestamp::from_millis(250)));
        assert!(set.is_visible());
        assert!(!set.advance(Timestamp::from_millis(300)));
        assert!(!set.is_visible());
        assert_eq!(set.opacity(), 0.0);

        let live = backend.live();
        assert_eq!(live.len(), 2);
        assert!(live.iter().all(|r| !r.visible && r.opacity == 0.0));
    }

    #[test]
    fn test_zero_duration_hide_is_immediate() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.rebuild_for_current_topology(&two_displays());
        set.show(Timestamp::ZERO, Duration::ZERO);
        assert_eq!(set.opacity(), 1.0);
        set.hide(Timestamp::ZERO, Duration::ZERO);
        assert!(!set.is_visible());
        assert!(!set.is_fading());
    }

    #[test]
    fn test_paint_dirty_only_while_visible() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.rebuild_for_current_topology(&two_displays());

        assert_eq!(set.paint_dirty(|_| Frame::new()), 0);
        set.show(Timestamp::ZERO, Duration::ZERO);
        assert_eq!(set.paint_dirty(|_| Frame::new()), 2);
        assert_eq!(set.paint_dirty(|_| Frame::new()), 0);

        set.request_repaint(1);
        set.request_repaint(7);
        assert!(set.surfaces()[1].is_dirty());
        assert!(!set.surfaces()[0].is_dirty());
        assert_eq!(set.paint_dirty(|_| Frame::new()), 1);
        assert_eq!(backend.live()[1].presents, 2);
    }

    #[test]
    fn test_new_surfaces_inherit_visibility() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.rebuild_for_current_topology(&two_displays());
        set.show(Timestamp::ZERO, Duration::ZERO);
        set.rebuild_for_current_topology(&two_displays());
        assert!(backend.live().iter().all(|r| r.visible && r.opacity == 1.0));
    }

    #[test]
    fn test_pump_reaches_backend() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.pump();
        set.pump();
        assert_eq!(backend.pumps(), 2);
        assert_eq!(set.pump_interval(), None);
    }

    #[test]
    fn test_native_backend_builds_or_declines() {
        // Test threads are never the macOS main thread and CI often has no
        // X server; both must surface as NotSupported, not a crash.
        match native_backend() {
            Ok(_) | Err(Error::NotSupported(_)) => {}
            Err(other) => panic!("unexpected native backend error: {other:?}"),
        }
    }

    #[test]
    fn test_fading_out() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.rebuild_for_current_topology(&two_displays());
        set.show(Timestamp::ZERO, Duration::from_millis(100));
        assert!(set.is_fading() && !set.is_fading_out());
        set.hide(Timestamp::from_millis(100), Duration::from_millis(100));
        assert!(set.is_fading_out());
    }

    #[test]
    fn test_surface_at() {
        let backend = HeadlessBackend::new();
        let mut set = set_with(&backend);
        set.rebuild_for_current_topology(&two_displays());
        assert_eq!(set.surface_at(Point::new(10.0, 10.0)), Some(0));
        assert_eq!(set.surface_at(Point::new(2000.0, -100.0)), Some(1));
        assert_eq!(set.surface_at(Point::new(-5.0, 10.0)), None);
    }
}

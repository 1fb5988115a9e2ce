//! The UI-thread side of the overlay.
//!
//! [`OverlayEngine`] owns everything that must only be touched from one
//! thread: the session, the surface set, the effect animator and its marks.
//! [`EventLoop`] is the single consumer of the [`UiMessage`] channel. It feeds
//! messages to the engine and paces [`OverlayEngine::frame`] at 60 Hz while
//! anything is moving, blocking on the channel otherwise.

use crate::animation::{Easing, EffectAnimator};
use crate::channel::{UiMessage, UiReceiver, UiSender};
use crate::clock::{Clock, Timestamp};
use crate::coords::{
    PrimaryReference, hook_to_virtual_desktop, virtual_desktop_to_hook,
    virtual_desktop_to_surface_local,
};
use crate::display::{CursorLocator, DisplayInfo, DisplayTopology};
use crate::error::{Error, Result};
use crate::event::{NormalizedPointerEvent, PointerButton, PointerKind};
use crate::geometry::Point;
use crate::monitor::{GlobalInputMonitor, MonitorStatus};
use crate::paint::Frame;
use crate::render::effects::label_anchor;
use crate::render::{EffectLayer, MarkKind, SpotlightParams, SpotlightRenderer};
use crate::session::{SessionEvent, SessionState, SpotlightSession};
use crate::settings::{HotkeyBinding, Settings, SettingsSource};
use crate::surface::{DisplaySurfaceSet, SurfaceBackend};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Target frame interval while something is animating.
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Owner of all overlay state. Lives on the UI thread.
pub struct OverlayEngine {
    clock: Arc<dyn Clock>,
    settings: Box<dyn SettingsSource>,
    topology: Box<dyn DisplayTopology>,
    cursor: Box<dyn CursorLocator>,
    primary: PrimaryReference,
    surfaces: DisplaySurfaceSet,
    session: SpotlightSession,
    animator: EffectAnimator<EffectLayer>,
    effects: EffectLayer,
    renderer: SpotlightRenderer,
    degraded: Option<String>,
}

impl OverlayEngine {
    pub fn new(
        clock: Arc<dyn Clock>,
        settings: Box<dyn SettingsSource>,
        topology: Box<dyn DisplayTopology>,
        cursor: Box<dyn CursorLocator>,
        backend: Box<dyn SurfaceBackend>,
    ) -> Self {
        Self {
            clock,
            settings,
            topology,
            cursor,
            primary: PrimaryReference::default(),
            surfaces: DisplaySurfaceSet::new(backend),
            session: SpotlightSession::new(),
            animator: EffectAnimator::new(),
            effects: EffectLayer::new(),
            renderer: SpotlightRenderer::new(),
            degraded: None,
        }
    }

    /// The primary-height reference hook routers must normalize against.
    pub fn primary_reference(&self) -> PrimaryReference {
        self.primary.clone()
    }

    /// Build the initial surfaces.
    pub fn start(&mut self) -> Result<()> {
        let displays = self.topology.displays()?;
        self.rebuild(&displays);
        Ok(())
    }

    fn rebuild(&mut self, displays: &[DisplayInfo]) {
        self.surfaces.rebuild_for_current_topology(displays);
        self.primary.set_height(self.surfaces.primary_height());
        let generation = self.surfaces.generation();
        let abandoned = self
            .animator
            .abandon_where(|scope| scope != Some(generation), &mut self.effects);
        if abandoned > 0 {
            log::debug!("abandoned {abandoned} effects bound to old surfaces");
        }
    }

    /// Apply one message from the channel.
    ///
    /// Messages meant for the input monitor are ignored here; the
    /// [`EventLoop`] routes those.
    pub fn handle_message(&mut self, message: UiMessage) {
        log::debug!("ui message: {message:?}");
        match message {
            UiMessage::Pointer(event) => self.on_pointer_event(event),
            UiMessage::HotkeyTriggered(at) => self.on_hotkey_triggered(at),
            UiMessage::EscapePressed => self.on_escape(),
            UiMessage::Keystroke { label, .. } => self.on_keystroke(label),
            UiMessage::MonitorDegraded(reason) => self.on_monitor_degraded(reason),
            UiMessage::TopologyChanged => self.on_topology_changed(),
            UiMessage::ReacquireInput | UiMessage::UpdateHotkey(_) | UiMessage::Shutdown => {}
        }
    }

    pub fn on_pointer_event(&mut self, event: NormalizedPointerEvent) {
        self.on_pointer_moved(event.position);
        if let PointerKind::ButtonDown(button) = event.kind {
            self.on_pointer_click(event.position, button);
        }
    }

    /// Forward a cursor position (virtual-desktop space) to the spotlight.
    pub fn on_pointer_moved(&mut self, position: Point) {
        if self.session.on_pointer_moved(position) {
            self.surfaces.request_repaint_all();
        }
    }

    /// Spawn a click ripple if click effects are enabled.
    ///
    /// Ripples do not depend on the spotlight; with the spotlight off the
    /// surfaces come up for the ripple alone.
    pub fn on_pointer_click(&mut self, position: Point, button: PointerButton) {
        let settings = self.settings.snapshot();
        if !settings.click_effects {
            return;
        }
        let color = match button {
            PointerButton::Secondary => settings.secondary_click_color,
            PointerButton::Primary | PointerButton::Other => settings.primary_click_color,
        };
        self.spawn_effect(
            MarkKind::Ripple { color },
            position,
            settings.ripple_duration(),
            Easing::EaseOutCubic,
        );
    }

    /// Show a keystroke label if the keystroke overlay is enabled.
    pub fn on_keystroke(&mut self, label: String) {
        let settings = self.settings.snapshot();
        if !settings.keystrokes {
            return;
        }
        let cursor = if self.session.is_active() {
            self.session.cursor()
        } else {
            self.sample_cursor()
        };
        let surface = cursor
            .and_then(|cursor| self.surfaces.surface_at(cursor))
            .unwrap_or(0);
        let Some(bounds) = self.surfaces.surfaces().get(surface).map(|s| s.bounds()) else {
            return;
        };
        self.spawn_effect(
            MarkKind::Label { text: label },
            label_anchor(bounds),
            settings.keystroke_duration(),
            Easing::Linear,
        );
    }

    fn spawn_effect(&mut self, kind: MarkKind, position: Point, duration: Duration, easing: Easing) {
        let id = self.effects.insert(kind, position);
        self.animator.start(
            self.clock.now(),
            duration,
            easing,
            Some(self.surfaces.generation()),
            Box::new(move |progress, effects: &mut EffectLayer| {
                effects.set_progress(id, progress)
            }),
            Box::new(move |effects: &mut EffectLayer| {
                effects.remove(id);
            }),
        );
        self.surfaces.request_repaint_all();
    }

    /// Toggle the spotlight. Triggers arrive already debounced.
    pub fn on_hotkey_triggered(&mut self, _at: Timestamp) {
        if self.session.is_active() {
            self.deactivate();
        } else {
            self.activate();
        }
    }

    pub fn on_escape(&mut self) {
        self.deactivate();
    }

    pub fn on_monitor_degraded(&mut self, reason: String) {
        log::warn!("input capture unavailable, relying on cursor polling: {reason}");
        self.degraded = Some(reason);
    }

    /// Rebuild every surface for the current displays and put the spotlight
    /// back where the cursor was.
    pub fn on_topology_changed(&mut self) {
        let displays = match self.topology.displays() {
            Ok(displays) => displays,
            Err(err) => {
                log::warn!("failed to query displays after topology change: {err}");
                return;
            }
        };
        let old_height = self.primary.height();
        self.rebuild(&displays);
        let new_height = self.primary.height();

        if let Some(cursor) = self.session.cursor() {
            let hook = virtual_desktop_to_hook(cursor, old_height);
            self.on_pointer_moved(hook_to_virtual_desktop(hook, new_height));
        }
        self.surfaces.request_repaint_all();
    }

    /// Show the spotlight. Returns `false` if it already was.
    pub fn activate(&mut self) -> bool {
        if self.session.is_active() {
            return false;
        }
        if self.surfaces.is_empty() {
            match self.topology.displays() {
                Ok(displays) => self.rebuild(&displays),
                Err(err) => log::warn!("failed to query displays: {err}"),
            }
        }
        let settings = self.settings.snapshot();
        let cursor = self.sample_cursor();
        let now = self.clock.now();
        self.session
            .activate(now, &settings, &mut self.surfaces, cursor)
    }

    /// Hide the spotlight. Idempotent.
    ///
    /// Pending timers are cancelled before this returns. Running ripples and
    /// labels keep going.
    pub fn deactivate(&mut self) -> bool {
        let settings = self.settings.snapshot();
        let now = self.clock.now();
        self.deactivate_with(now, &settings)
    }

    fn deactivate_with(&mut self, now: Timestamp, settings: &Settings) -> bool {
        if !self.session.deactivate(now, settings, &mut self.surfaces) {
            return false;
        }
        self.surfaces.request_repaint_all();
        true
    }

    fn sample_cursor(&self) -> Option<Point> {
        match self.cursor.cursor_position() {
            Ok(position) => Some(self.primary.normalize(position)),
            Err(err) => {
                log::debug!("cursor query failed: {err}");
                None
            }
        }
    }

    /// Run everything that is due and paint dirty surfaces.
    pub fn frame(&mut self) {
        let now = self.clock.now();
        let settings = self.settings.snapshot();

        for event in self.session.tick(now) {
            match event {
                SessionEvent::AutoDeactivateFired => {
                    self.deactivate_with(now, &settings);
                }
                SessionEvent::PollCursor => {
                    if let Some(position) = self.sample_cursor() {
                        self.on_pointer_moved(position);
                    }
                }
                SessionEvent::ScaleChanged => self.surfaces.request_repaint_all(),
            }
        }

        self.surfaces.advance(now);

        let running = !self.animator.is_idle();
        let completed = self.animator.tick(now, &mut self.effects);
        if running || completed > 0 {
            self.surfaces.request_repaint_all();
        }
        self.hold_surfaces_for_effects(now);

        self.paint(&settings);
    }

    /// Keep the surfaces up while effects run with the spotlight off, and
    /// take them down once the last one finishes.
    fn hold_surfaces_for_effects(&mut self, now: Timestamp) {
        if self.session.is_active() {
            return;
        }
        let busy = !self.animator.is_idle();
        if busy && (!self.surfaces.is_visible() || self.surfaces.is_fading_out()) {
            self.surfaces.show(now, Duration::ZERO);
        } else if !busy && self.surfaces.is_visible() && !self.surfaces.is_fading() {
            self.surfaces.hide(now, Duration::ZERO);
        }
    }

    /// Whether the dim mask belongs on screen: while active, and while the
    /// exit transition or fade-out is still running.
    fn spotlight_shown(&self) -> bool {
        self.session.is_active()
            || self.session.is_transitioning()
            || self.surfaces.is_fading_out()
    }

    fn paint(&mut self, settings: &Settings) {
        let radius = settings.clamped_radius() * self.session.scale();
        let cursor = self.session.cursor();
        let spotlight = self.spotlight_shown();
        let renderer = &self.renderer;
        let effects = &self.effects;
        self.surfaces.paint_dirty(|surface| {
            let bounds = surface.bounds();
            if !spotlight {
                let mut frame = Frame::new();
                effects.paint_into(&mut frame, bounds);
                return frame;
            }
            let params = SpotlightParams {
                center: cursor.map(|c| virtual_desktop_to_surface_local(c, bounds.origin())),
                radius,
                shape: settings.shape,
                dim_color: settings.dim_color,
                dim_opacity: settings.clamped_dim_opacity(),
                edge_blur: settings.clamped_edge_blur(),
            };
            let mut frame = renderer.paint(bounds.size(), &params);
            effects.paint_into(&mut frame, bounds);
            frame
        });
    }

    /// Let the surface backend service its window system.
    pub fn pump_surfaces(&mut self) {
        self.surfaces.pump();
    }

    /// How often [`pump_surfaces`](Self::pump_surfaces) must run even when
    /// nothing animates.
    pub fn pump_interval(&self) -> Option<Duration> {
        self.surfaces.pump_interval()
    }

    /// Whether [`frame`](Self::frame) must keep being called at frame rate.
    pub fn needs_frames(&self) -> bool {
        self.session.is_active()
            || self.session.is_transitioning()
            || self.surfaces.is_fading()
            || self.surfaces.has_dirty()
            || !self.animator.is_idle()
    }

    /// Drop the spotlight immediately, without transitions.
    pub fn shutdown(&mut self) {
        let settings = Settings {
            activation_secs: 0.0,
            ..self.settings.snapshot()
        };
        let now = self.clock.now();
        self.deactivate_with(now, &settings);
        self.animator.abandon_all(&mut self.effects);
        self.surfaces.hide(now, Duration::ZERO);
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &SpotlightSession {
        &self.session
    }

    pub fn surfaces(&self) -> &DisplaySurfaceSet {
        &self.surfaces
    }

    pub fn active_effects(&self) -> usize {
        self.animator.active_count()
    }

    pub fn effects(&self) -> &EffectLayer {
        &self.effects
    }

    /// Why input capture is unavailable, if it is.
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// The spotlight hotkey currently configured.
    pub fn configured_hotkey(&self) -> HotkeyBinding {
        self.settings.snapshot().hotkey
    }
}

/// Single consumer of the UI channel.
pub struct EventLoop {
    engine: OverlayEngine,
    receiver: UiReceiver,
    monitor: Option<GlobalInputMonitor>,
    started: bool,
    running: bool,
}

impl EventLoop {
    pub fn new(engine: OverlayEngine, receiver: UiReceiver) -> Self {
        Self {
            engine,
            receiver,
            monitor: None,
            started: false,
            running: false,
        }
    }

    /// Route hotkey and reacquire requests to `monitor`, and start/stop it
    /// with the loop.
    pub fn with_monitor(mut self, monitor: GlobalInputMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn engine(&self) -> &OverlayEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut OverlayEngine {
        &mut self.engine
    }

    pub fn monitor(&self) -> Option<&GlobalInputMonitor> {
        self.monitor.as_ref()
    }

    /// Build surfaces, register the hotkey and start input capture.
    ///
    /// Called by [`run`](Self::run) and the first [`pump`](Self::pump);
    /// later calls do nothing.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.engine.start()?;
        if let Some(monitor) = &self.monitor {
            monitor.register_hotkey(self.engine.configured_hotkey());
            if let MonitorStatus::Degraded(reason) = monitor.start() {
                log::warn!("starting without input capture: {reason}");
            }
        }
        self.running = true;
        Ok(())
    }

    fn dispatch(&mut self, message: UiMessage) {
        match message {
            UiMessage::Shutdown => self.running = false,
            UiMessage::ReacquireInput => {
                if let Some(monitor) = &self.monitor {
                    log::info!("reacquiring input capture: {:?}", monitor.reacquire());
                }
            }
            UiMessage::UpdateHotkey(binding) => {
                if let Some(monitor) = &self.monitor {
                    monitor.update_hotkey(binding);
                }
            }
            other => self.engine.handle_message(other),
        }
    }

    /// Process every queued message and run one frame without blocking.
    ///
    /// Returns `false` once a shutdown was requested or every sender is gone.
    pub fn pump(&mut self) -> Result<bool> {
        if !self.started {
            self.start()?;
        }
        if !self.running {
            return Ok(false);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(Some(message)) => self.dispatch(message),
                Ok(None) => break,
                Err(Error::Disconnected) => {
                    self.running = false;
                    break;
                }
                Err(err) => return Err(err),
            }
            if !self.running {
                break;
            }
        }
        if self.running {
            self.engine.pump_surfaces();
            self.engine.frame();
        } else {
            self.finish()?;
        }
        Ok(self.running)
    }

    /// Run until [`UiMessage::Shutdown`] or until every sender is dropped.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        let mut next_frame = Instant::now();

        while self.running {
            let frame_wait = self
                .engine
                .needs_frames()
                .then(|| next_frame.saturating_duration_since(Instant::now()));
            let wait = match (frame_wait, self.engine.pump_interval()) {
                (Some(frame), Some(pump)) => Some(frame.min(pump)),
                (frame, pump) => frame.or(pump),
            };
            let received = match wait {
                Some(timeout) => self.receiver.recv_timeout(timeout),
                None => self.receiver.recv().map(Some),
            };

            match received {
                Ok(Some(message)) => self.dispatch(message),
                Ok(None) => {}
                Err(Error::Disconnected) => break,
                Err(err) => return Err(err),
            }

            self.engine.pump_surfaces();
            let now = Instant::now();
            if self.running && now >= next_frame {
                self.engine.frame();
                next_frame = now + FRAME_INTERVAL;
            }
        }

        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.running = false;
        self.engine.shutdown();
        if let Some(monitor) = &self.monitor {
            monitor.stop()?;
        }
        log::info!("event loop stopped");
        Ok(())
    }
}

/// Lets the host talk to a running [`EventLoop`] from any thread.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: UiSender,
}

impl EngineHandle {
    pub fn new(sender: UiSender) -> Self {
        Self { sender }
    }

    /// Displays were added, removed or resized.
    pub fn topology_changed(&self) -> Result<()> {
        self.sender.send(UiMessage::TopologyChanged)
    }

    /// Retry input capture, e.g. after permission was granted.
    pub fn reacquire_input(&self) -> Result<()> {
        self.sender.send(UiMessage::ReacquireInput)
    }

    pub fn update_hotkey(&self, binding: HotkeyBinding) -> Result<()> {
        self.sender.send(UiMessage::UpdateHotkey(binding))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.sender.send(UiMessage::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ui_channel;
    use crate::clock::ManualClock;
    use crate::display::{ManualCursor, StaticTopology};
    use crate::geometry::Rect;
    use crate::settings::SharedSettings;
    use crate::surface::HeadlessBackend;

    struct Rig {
        clock: ManualClock,
        settings: SharedSettings,
        backend: HeadlessBackend,
        engine: OverlayEngine,
    }

    fn rig() -> Rig {
        let clock = ManualClock::new();
        let settings = SharedSettings::default();
        let backend = HeadlessBackend::new();
        let mut engine = OverlayEngine::new(
            Arc::new(clock.clone()),
            Box::new(settings.clone()),
            Box::new(StaticTopology::new(vec![DisplayInfo::new(
                1,
                Rect::new(0.0, 0.0, 800.0, 600.0),
                true,
            )])),
            Box::new(ManualCursor::new(Point::new(400.0, 100.0))),
            Box::new(backend.clone()),
        );
        engine.start().unwrap();
        Rig {
            clock,
            settings,
            backend,
            engine,
        }
    }

    #[test]
    fn test_activate_samples_cursor_immediately() {
        let mut rig = rig();
        assert!(rig.engine.activate());
        // Hook y=100 on a 600-high primary.
        assert_eq!(rig.engine.session().cursor(), Some(Point::new(400.0, 500.0)));
        rig.engine.frame();
        assert!(rig.backend.live()[0].last_frame.is_some());
    }

    fn has_mask(frame: &Frame) -> bool {
        frame
            .ops()
            .iter()
            .any(|op| matches!(op, crate::paint::PaintOp::FillWithHole { .. }))
    }

    fn has_ripple(frame: &Frame) -> bool {
        frame
            .ops()
            .iter()
            .any(|op| matches!(op, crate::paint::PaintOp::StrokeOutline { .. }))
    }

    #[test]
    fn test_ripples_without_spotlight() {
        let mut rig = rig();
        rig.engine
            .on_pointer_click(Point::new(40.0, 40.0), PointerButton::Primary);
        assert_eq!(rig.engine.active_effects(), 1);
        assert!(rig.engine.needs_frames());

        rig.clock.advance(Duration::from_millis(16));
        rig.engine.frame();
        let record = rig.backend.live()[0].clone();
        assert!(record.visible);
        assert_eq!(record.opacity, 1.0);
        let frame = record.last_frame.unwrap();
        assert!(has_ripple(&frame));
        assert!(!has_mask(&frame));

        rig.clock.advance(Duration::from_secs(1));
        rig.engine.frame();
        assert!(rig.engine.effects().is_empty());
        assert!(!rig.backend.live()[0].visible);
        assert!(!rig.engine.needs_frames());
    }

    #[test]
    fn test_keystroke_without_spotlight() {
        let mut rig = rig();
        rig.settings.update(|s| s.keystrokes = true);
        rig.engine.on_keystroke("Ctrl+K".into());
        assert_eq!(rig.engine.active_effects(), 1);
        rig.engine.frame();
        assert!(rig.backend.live()[0].visible);
    }

    #[test]
    fn test_effects_survive_deactivate() {
        let mut rig = rig();
        rig.engine.activate();
        rig.engine
            .on_pointer_click(Point::new(1.0, 1.0), PointerButton::Secondary);
        rig.engine
            .on_pointer_click(Point::new(2.0, 1.0), PointerButton::Primary);
        assert_eq!(rig.engine.active_effects(), 2);

        rig.engine.deactivate();
        rig.clock.advance(Duration::from_millis(16));
        rig.engine.frame();
        assert_eq!(rig.engine.active_effects(), 2);
        assert!(rig.engine.surfaces().is_visible());
        assert!(!rig.engine.surfaces().is_fading_out());

        rig.settings.update(|s| s.click_effects = false);
        rig.engine
            .on_pointer_click(Point::new(3.0, 1.0), PointerButton::Primary);
        assert_eq!(rig.engine.active_effects(), 2);
    }

    #[test]
    fn test_ripples_finish_and_release_marks() {
        let mut rig = rig();
        rig.engine.activate();
        rig.engine.on_pointer_click(Point::new(10.0, 10.0), PointerButton::Primary);
        rig.clock.advance(Duration::from_millis(200));
        rig.engine.frame();
        assert_eq!(rig.engine.effects().len(), 1);
        rig.clock.advance(Duration::from_millis(200));
        rig.engine.frame();
        assert!(rig.engine.effects().is_empty());
        assert_eq!(rig.engine.active_effects(), 0);
    }

    #[test]
    fn test_keystrokes_respect_setting() {
        let mut rig = rig();
        rig.engine.activate();
        rig.engine.on_keystroke("K".into());
        assert_eq!(rig.engine.active_effects(), 0);

        rig.settings.update(|s| s.keystrokes = true);
        rig.engine.on_keystroke("Ctrl+K".into());
        assert_eq!(rig.engine.active_effects(), 1);
    }

    #[test]
    fn test_radius_reread_every_frame() {
        let mut rig = rig();
        rig.settings.update(|s| s.activation_secs = 0.0);
        rig.engine.activate();
        rig.engine.frame();
        rig.settings.update(|s| s.radius = 10_000.0);
        rig.engine.on_pointer_moved(Point::new(300.0, 300.0));
        rig.engine.frame();

        let frame = rig.backend.live()[0].last_frame.clone().unwrap();
        let radius = frame.ops().iter().find_map(|op| match op {
            crate::paint::PaintOp::FillWithHole {
                hole: Some(crate::paint::Outline::Circle { radius, .. }),
                ..
            } => Some(*radius),
            _ => None,
        });
        assert_eq!(radius, Some(500.0));
    }

    #[test]
    fn test_pump_stops_on_shutdown() {
        let (tx, rx) = ui_channel();
        let rig = rig();
        let mut event_loop = EventLoop::new(rig.engine, rx);
        let handle = EngineHandle::new(tx);
        assert!(event_loop.pump().unwrap());
        assert_eq!(rig.backend.pumps(), 1);
        handle.shutdown().unwrap();
        assert!(!event_loop.pump().unwrap());
        assert_eq!(rig.backend.pumps(), 1);
    }
}

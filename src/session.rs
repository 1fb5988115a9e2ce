//! The spotlight activation state machine.
//!
//! [`SpotlightSession`] moves between [`SessionState::Inactive`] and
//! [`SessionState::Active`]. While active it owns two timers: the optional
//! auto-deactivate deadline and a 60 Hz cursor poll that keeps the spotlight
//! moving when the input hook is degraded. Both live in a [`TimerQueue`]
//! polled from [`SpotlightSession::tick`], so deactivation cancels them
//! before it returns.
//!
//! The session does not paint or read the cursor itself. It tells the
//! engine what is due through [`SessionEvent`]s.

use crate::animation::Easing;
use crate::clock::Timestamp;
use crate::geometry::Point;
use crate::settings::{ActivationStyle, Settings};
use crate::surface::DisplaySurfaceSet;
use crate::timer::{TimerId, TimerQueue};
use std::time::Duration;

/// Cursor poll period while active.
pub const POLL_INTERVAL: Duration = Duration::from_micros(16_667);

/// Spotlight scale at the small end of the zoom transition.
pub const ZOOM_FROM: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    AutoDeactivate,
    PositionPoll,
}

/// Something the owner has to act on after a [`SpotlightSession::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The auto-deactivate deadline passed; the owner should deactivate.
    AutoDeactivateFired,
    /// Time to sample the cursor position.
    PollCursor,
    /// The entry/exit transition moved; the spotlight needs repainting.
    ScaleChanged,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    from: f64,
    to: f64,
    start: Timestamp,
    duration: Duration,
    easing: Easing,
}

impl Transition {
    fn scale_at(&self, now: Timestamp) -> (f64, bool) {
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            (now.saturating_since(self.start).as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };
        if progress >= 1.0 {
            return (self.to, true);
        }
        (self.from + (self.to - self.from) * self.easing.apply(progress), false)
    }
}

#[derive(Debug)]
pub struct SpotlightSession {
    state: SessionState,
    timers: TimerQueue<SessionTimer>,
    auto_deactivate: Option<TimerId>,
    poll: Option<TimerId>,
    cursor: Option<Point>,
    scale: f64,
    transition: Option<Transition>,
}

impl Default for SpotlightSession {
    fn default() -> Self {
        Self {
            state: SessionState::Inactive,
            timers: TimerQueue::new(),
            auto_deactivate: None,
            poll: None,
            cursor: None,
            scale: 1.0,
            transition: None,
        }
    }
}

impl SpotlightSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the spotlight.
    ///
    /// `cursor` is the position sampled right now (virtual-desktop space),
    /// so the cut-out is placed without waiting for the next hook event.
    /// Returns `false` if already active.
    pub fn activate(
        &mut self,
        now: Timestamp,
        settings: &Settings,
        surfaces: &mut DisplaySurfaceSet,
        cursor: Option<Point>,
    ) -> bool {
        if self.state == SessionState::Active {
            return false;
        }
        self.state = SessionState::Active;
        if cursor.is_some() {
            self.cursor = cursor;
        }

        let duration = settings.activation_duration();
        surfaces.show(now, duration);
        match settings.activation_style {
            ActivationStyle::Zoom => {
                self.begin_transition(now, ZOOM_FROM, 1.0, duration, Easing::EaseOutCubic);
            }
            ActivationStyle::Fade => {
                self.transition = None;
                self.scale = 1.0;
            }
        }

        self.timers.cancel_all();
        self.auto_deactivate = settings
            .auto_deactivate_after()
            .map(|after| self.timers.schedule(SessionTimer::AutoDeactivate, now + after));
        self.poll = Some(self.timers.schedule_repeating(
            SessionTimer::PositionPoll,
            now + POLL_INTERVAL,
            POLL_INTERVAL,
        ));

        surfaces.request_repaint_all();
        log::info!("spotlight activated");
        true
    }

    /// Hide the spotlight. Idempotent.
    ///
    /// Both timers are cancelled before this returns. The exit transition
    /// and the surface fade-out run afterwards on their own.
    pub fn deactivate(
        &mut self,
        now: Timestamp,
        settings: &Settings,
        surfaces: &mut DisplaySurfaceSet,
    ) -> bool {
        if self.state == SessionState::Inactive {
            return false;
        }
        self.state = SessionState::Inactive;
        for id in [self.auto_deactivate.take(), self.poll.take()].into_iter().flatten() {
            self.timers.cancel(id);
        }
        debug_assert_eq!(self.timers.pending(), 0);

        let duration = settings.activation_duration();
        if settings.activation_style == ActivationStyle::Zoom {
            self.begin_transition(now, self.scale, ZOOM_FROM, duration, Easing::EaseInCubic);
        } else {
            self.transition = None;
        }
        surfaces.hide(now, duration);

        log::info!("spotlight deactivated");
        true
    }

    fn begin_transition(
        &mut self,
        now: Timestamp,
        from: f64,
        to: f64,
        duration: Duration,
        easing: Easing,
    ) {
        let transition = Transition {
            from,
            to,
            start: now,
            duration,
            easing,
        };
        let (scale, done) = transition.scale_at(now);
        self.scale = scale;
        self.transition = (!done).then_some(transition);
    }

    /// Record a new cursor position. Ignored while inactive.
    ///
    /// Returns whether the position changed.
    pub fn on_pointer_moved(&mut self, position: Point) -> bool {
        if self.state != SessionState::Active || !position.is_finite() {
            return false;
        }
        if self.cursor == Some(position) {
            return false;
        }
        self.cursor = Some(position);
        true
    }

    /// Fire due timers and advance the transition.
    pub fn tick(&mut self, now: Timestamp) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(transition) = self.transition {
            let (scale, done) = transition.scale_at(now);
            if scale != self.scale {
                self.scale = scale;
                events.push(SessionEvent::ScaleChanged);
            }
            if done {
                self.transition = None;
            }
        }

        for (id, timer) in self.timers.poll_expired(now) {
            match timer {
                SessionTimer::AutoDeactivate => {
                    log::debug!("auto-deactivate timer fired");
                    if self.auto_deactivate == Some(id) {
                        self.auto_deactivate = None;
                    }
                    events.push(SessionEvent::AutoDeactivateFired);
                }
                SessionTimer::PositionPoll => events.push(SessionEvent::PollCursor),
            }
        }
        events
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Last known cursor position in virtual-desktop space.
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// Current spotlight radius multiplier from the zoom transition.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn auto_deactivate_deadline(&self) -> Option<Timestamp> {
        self.auto_deactivate.and_then(|id| self.timers.deadline(id))
    }

    /// Next time [`tick`](Self::tick) has something to report.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayInfo;
    use crate::geometry::Rect;
    use crate::surface::HeadlessBackend;

    fn surfaces() -> DisplaySurfaceSet {
        let mut set = DisplaySurfaceSet::new(Box::new(HeadlessBackend::new()));
        set.rebuild_for_current_topology(&[DisplayInfo::new(
            1,
            Rect::new(0.0, 0.0, 1920.0, 1080.0),
            true,
        )]);
        set
    }

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn auto_settings(secs: f64) -> Settings {
        Settings {
            auto_deactivate: true,
            auto_deactivate_secs: secs,
            ..Settings::default()
        }
    }

    #[test]
    fn test_activate_then_deactivate_leaves_no_timers() {
        let mut set = surfaces();
        let mut session = SpotlightSession::new();
        let settings = auto_settings(5.0);

        assert!(session.activate(at(0), &settings, &mut set, Some(Point::new(5.0, 5.0))));
        assert_eq!(session.pending_timers(), 2);
        assert!(session.deactivate(at(0), &settings, &mut set));
        assert_eq!(session.pending_timers(), 0);

        let events = session.tick(at(60_000));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SessionEvent::PollCursor | SessionEvent::AutoDeactivateFired)),
            "{events:?}"
        );
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let mut set = surfaces();
        let mut session = SpotlightSession::new();
        let settings = Settings::default();
        assert!(!session.deactivate(at(0), &settings, &mut set));
        session.activate(at(0), &settings, &mut set, None);
        assert!(!session.activate(at(1), &settings, &mut set, None));
        assert!(session.deactivate(at(2), &settings, &mut set));
        assert!(!session.deactivate(at(3), &settings, &mut set));
    }

    #[test]
    fn test_auto_deactivate_clamped_and_fires() {
        let mut set = surfaces();
        let mut session = SpotlightSession::new();
        session.activate(at(0), &auto_settings(0.2), &mut set, None);
        assert_eq!(session.auto_deactivate_deadline(), Some(at(1_000)));

        assert!(!session.tick(at(999)).contains(&SessionEvent::AutoDeactivateFired));
        assert!(session.tick(at(1_000)).contains(&SessionEvent::AutoDeactivateFired));
        assert_eq!(session.auto_deactivate_deadline(), None);
    }

    #[test]
    fn test_no_auto_timer_when_disabled() {
        let mut set = surfaces();
        let mut session = SpotlightSession::new();
        session.activate(at(0), &Settings::default(), &mut set, None);
        assert_eq!(session.auto_deactivate_deadline(), None);
        assert_eq!(session.pending_timers(), 1);
    }

    #[test]
    fn test_poll_runs_at_sixty_hertz() {
        let mut set = surfaces();
        let mut session = SpotlightSession::new();
        session.activate(at(0), &Settings::default(), &mut set, None);
        let polls = (1..=60)
            .map(|i| at(i * 1000 / 60 + 1))
            .filter(|now| session.tick(*now).contains(&SessionEvent::PollCursor))
            .count();
        assert!((59..=60).contains(&polls), "{polls}");
    }

    #[test]
    fn test_pointer_ignored_while_inactive() {
        let mut session = SpotlightSession::new();
        assert!(!session.on_pointer_moved(Point::new(1.0, 1.0)));
        assert_eq!(session.cursor(), None);

        let mut set = surfaces();
        session.activate(at(0), &Settings::default(), &mut set, None);
        assert!(session.on_pointer_moved(Point::new(1.0, 1.0)));
        assert!(!session.on_pointer_moved(Point::new(1.0, 1.0)));
        assert!(!session.on_pointer_moved(Point::new(f64::NAN, 1.0)));
    }

    #[test]
    fn test_zoom_transition_scales_radius() {
        let mut set = surfaces();
        let mut session = SpotlightSession::new();
        let settings = Settings {
            activation_secs: 0.2,
            ..Settings::default()
        };
        session.activate(at(0), &settings, &mut set, None);
        assert_eq!(session.scale(), ZOOM_FROM);
        // The overlay fades in alongside the zoom.
        assert_eq!(set.opacity(), 0.0);
        assert!(set.is_fading());

        assert!(session.tick(at(100)).contains(&SessionEvent::ScaleChanged));
        // Ease-out: 0.3 + 0.7 * 0.875
        assert!((session.scale() - 0.9125).abs() < 1e-9);
        assert!(set.advance(at(100)));
        assert!((set.opacity() - 0.875).abs() < 1e-9);
        session.tick(at(200));
        assert!(!set.advance(at(200)));
        assert_eq!(session.scale(), 1.0);
        assert_eq!(set.opacity(), 1.0);
        assert!(!session.is_transitioning());

        session.deactivate(at(300), &settings, &mut set);
        session.tick(at(400));
        // Ease-in: 1.0 - 0.7 * 0.125
        assert!((session.scale() - 0.9125).abs() < 1e-9);
        assert!(set.is_fading());
    }

    #[test]
    fn test_fade_style_keeps_full_scale() {
        let mut set = surfaces();
        let mut session = SpotlightSession::new();
        let settings = Settings {
            activation_style: ActivationStyle::Fade,
            ..Settings::default()
        };
        session.activate(at(0), &settings, &mut set, None);
        assert_eq!(session.scale(), 1.0);
        assert_eq!(set.opacity(), 0.0);
        assert!(set.is_fading());
    }
}

//! # limelight
//!
//! A multi-monitor cursor spotlight engine driven by global input hooks.
//!
//! ## Features
//!
//! - Listen-only global input hooks on macOS, Windows and Linux (X11)
//! - One transparent, click-through overlay window per display (AppKit,
//!   layered Win32 windows, or ARGB X11 windows), rebuilt on topology changes
//! - A dimming mask with a cursor-following cut-out in six shapes, with hard
//!   or soft edges
//! - Click ripples and keystroke labels driven by a frame-clock animator
//! - A debounced spotlight hotkey, Escape to dismiss, optional auto-deactivate
//!
//! ## Quick Start
//!
//! ```no_run
//! use limelight::{
//!     AlwaysAuthorized, EventLoop, GlobalInputMonitor, MonotonicClock, OverlayEngine,
//!     SharedSettings, SystemDisplays, native_backend, ui_channel,
//! };
//! use std::sync::Arc;
//!
//! let clock = Arc::new(MonotonicClock::new());
//! let (tx, rx) = ui_channel();
//! let engine = OverlayEngine::new(
//!     clock.clone(),
//!     Box::new(SharedSettings::default()),
//!     Box::new(SystemDisplays),
//!     Box::new(SystemDisplays),
//!     native_backend()?,
//! );
//! let monitor = GlobalInputMonitor::new(
//!     tx,
//!     clock,
//!     engine.primary_reference(),
//!     Arc::new(AlwaysAuthorized),
//! );
//! EventLoop::new(engine, rx).with_monitor(monitor).run()?;
//! # Ok::<(), limelight::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Hook callbacks run on a background thread. They only stamp, normalize and
//! classify raw events (see [`monitor`]) before sending them over the
//! [`channel`] to the UI thread. Everything stateful (the [`session`], the
//! [`surface`] set and the [`animation`] scheduler) lives in an
//! [`OverlayEngine`] owned by that thread, so none of it needs a lock.
//!
//! The hook thread and the UI thread share exactly three things: the held
//! modifier mask (see [`state`]), the hotkey debouncer, and the primary
//! display height used to flip hook coordinates (see [`coords`]).

pub mod animation;
pub mod channel;
pub mod clock;
pub mod coords;
pub mod debounce;
pub mod display;
pub mod engine;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hook;
pub mod keycode;
pub mod monitor;
pub mod paint;
pub mod render;
pub mod session;
pub mod settings;
pub mod state;
pub mod surface;
pub mod timer;

mod platform;

// Re-exports
pub use animation::{AnimationHandle, Easing, EffectAnimator};
pub use channel::{UiMessage, UiReceiver, UiSender, ui_channel};
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use display::{
    CursorLocator, DisplayInfo, DisplayTopology, SystemDisplays, cursor_position, displays,
};
pub use engine::{EngineHandle, EventLoop, OverlayEngine};
pub use error::{Error, Result};
pub use event::{Event, EventType, NormalizedPointerEvent, PointerButton, PointerKind};
pub use geometry::{Point, Rect, Size};
pub use hook::{EventHandler, Hook};
pub use keycode::Key;
pub use monitor::{
    AlwaysAuthorized, GlobalInputMonitor, HotkeySlot, MonitorStatus, PermissionProvider,
};
pub use paint::{Color, Frame, PaintOp};
pub use render::{Canvas, LabelFont, SpotlightParams, SpotlightRenderer};
pub use session::{SessionState, SpotlightSession};
pub use settings::{
    ActivationStyle, HotkeyBinding, Settings, SettingsSource, SharedSettings, SpotlightShape,
};
pub use state::Modifiers;
pub use surface::{
    DisplaySurfaceSet, HeadlessBackend, OverlaySurface, SurfaceBackend, native_backend,
};

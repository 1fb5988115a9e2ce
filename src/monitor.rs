//! Global input monitoring: hook ownership, hotkey matching and marshaling.
//!
//! [`GlobalInputMonitor`] owns the platform hook. Every raw event the hook
//! delivers goes through an [`InputRouter`] on the hook thread, which stamps
//! it, normalizes pointer positions into virtual-desktop space, recognizes
//! the spotlight hotkey and Escape, and forwards the result to the UI thread
//! as a [`UiMessage`]. Nothing else happens off the UI thread.
//!
//! Failing to acquire the hook is not an error for the caller: the monitor
//! switches to [`MonitorStatus::Degraded`], callbacks simply stop arriving,
//! and the spotlight falls back to polling the cursor.

use crate::channel::{UiMessage, UiSender};
use crate::clock::{Clock, Timestamp};
use crate::coords::PrimaryReference;
use crate::debounce::TriggerDebouncer;
use crate::error::{Error, Result};
use crate::event::{Event, EventType, KeyboardData, NormalizedPointerEvent, PointerKind};
use crate::hook::{EventHandler, Hook};
use crate::keycode::Key;
use crate::settings::HotkeyBinding;
use crate::state::Modifiers;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Whether the host has been granted input monitoring.
pub trait PermissionProvider: Send + Sync {
    fn input_monitoring_authorized(&self) -> bool;
}

/// Permission check for platforms without a consent prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAuthorized;

impl PermissionProvider for AlwaysAuthorized {
    fn input_monitoring_authorized(&self) -> bool {
        true
    }
}

impl<F> PermissionProvider for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn input_monitoring_authorized(&self) -> bool {
        self()
    }
}

/// What the monitor is currently doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorStatus {
    Stopped,
    Running,
    /// No input capture; the reason is informational.
    Degraded(String),
}

/// The spotlight hotkey, shared by the monitor and its routers.
///
/// A press latches `held` until the matching release so auto-repeat is not
/// a new trigger. Rebinding and hook (re)enables clear the latch because the
/// release it waits for may never arrive.
#[derive(Debug, Default)]
pub struct HotkeySlot {
    binding: RwLock<Option<HotkeyBinding>>,
    held: AtomicBool,
}

impl HotkeySlot {
    pub fn new(binding: Option<HotkeyBinding>) -> Self {
        Self {
            binding: RwLock::new(binding),
            held: AtomicBool::new(false),
        }
    }

    pub fn binding(&self) -> Option<HotkeyBinding> {
        match self.binding.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replace the binding and re-arm.
    pub fn set(&self, binding: Option<HotkeyBinding>) {
        match self.binding.write() {
            Ok(mut guard) => *guard = binding,
            Err(poisoned) => *poisoned.into_inner() = binding,
        }
        self.release();
    }

    /// Latch a press. Returns `false` if the key was already held.
    fn press(&self) -> bool {
        !self.held.swap(true, Ordering::AcqRel)
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Hook-thread half of the monitor.
///
/// Public so that synthetic events can be pushed through exactly the code
/// path real hook callbacks take.
pub struct InputRouter {
    sender: UiSender,
    clock: Arc<dyn Clock>,
    primary: PrimaryReference,
    hotkey: Arc<HotkeySlot>,
    debouncer: Arc<TriggerDebouncer>,
}

impl InputRouter {
    pub fn new(
        sender: UiSender,
        clock: Arc<dyn Clock>,
        primary: PrimaryReference,
        hotkey: Arc<HotkeySlot>,
        debouncer: Arc<TriggerDebouncer>,
    ) -> Self {
        Self {
            sender,
            clock,
            primary,
            hotkey,
            debouncer,
        }
    }

    fn forward(&self, message: UiMessage) {
        // A closed channel means the UI thread is gone; nothing left to tell.
        let _ = self.sender.send(message);
    }

    fn pointer(&self, event: &Event, kind: PointerKind, at: Timestamp) {
        if let Some(position) = event.position() {
            self.forward(UiMessage::Pointer(NormalizedPointerEvent {
                kind,
                position: self.primary.normalize(position),
                timestamp: at,
            }));
        }
    }

    fn is_hotkey(&self, event: &Event, keyboard: &KeyboardData) -> bool {
        self.hotkey.binding().is_some_and(|b| {
            b.key_code == keyboard.raw_code && Modifiers::from_bits(event.mask) == b.modifiers
        })
    }

    fn is_hotkey_key(&self, keyboard: &KeyboardData) -> bool {
        self.hotkey
            .binding()
            .is_some_and(|b| b.key_code == keyboard.raw_code)
    }

    fn key_pressed(&self, event: &Event, at: Timestamp) {
        let Some(keyboard) = event.keyboard.as_ref() else {
            return;
        };

        if self.is_hotkey(event, keyboard) {
            // Auto-repeat while the key is held is not a new press.
            if !self.hotkey.press() {
                return;
            }
            if self.debouncer.try_accept(at) {
                self.forward(UiMessage::HotkeyTriggered(at));
            } else {
                log::debug!("duplicate hotkey trigger suppressed");
            }
            return;
        }

        if keyboard.key == Key::Escape {
            self.forward(UiMessage::EscapePressed);
        }

        if !keyboard.key.is_modifier() {
            let label = format!(
                "{}{}",
                Modifiers::from_bits(event.mask).label_prefix(),
                keyboard.key.label()
            );
            self.forward(UiMessage::Keystroke {
                label,
                timestamp: at,
            });
        }
    }

    fn key_released(&self, event: &Event) {
        if let Some(keyboard) = event.keyboard.as_ref()
            && self.is_hotkey_key(keyboard)
        {
            self.hotkey.release();
        }
    }
}

impl EventHandler for InputRouter {
    fn handle_event(&self, event: &Event) {
        // Sampled before anything else so the debounce sees receipt time.
        let at = self.clock.now();

        match event.event_type {
            EventType::MouseMoved | EventType::MouseDragged => {
                self.pointer(event, PointerKind::Move, at)
            }
            EventType::MousePressed => {
                let button = event
                    .mouse
                    .as_ref()
                    .and_then(|m| m.button)
                    .map(Into::into)
                    .unwrap_or(crate::event::PointerButton::Other);
                self.pointer(event, PointerKind::ButtonDown(button), at)
            }
            EventType::MouseReleased => {}
            EventType::KeyPressed => self.key_pressed(event, at),
            EventType::KeyReleased => self.key_released(event),
            EventType::HookEnabled => {
                log::debug!("input hook enabled");
                self.hotkey.release();
            }
            EventType::HookDisabled => log::debug!("input hook disabled"),
            EventType::HookReenabled => {
                log::warn!("input hook was disabled by the OS and has been re-enabled");
                // Releases delivered while the hook was off are gone.
                self.hotkey.release();
            }
        }
    }
}

/// Owner of the system-wide input hook and the spotlight hotkey.
pub struct GlobalInputMonitor {
    hook: Hook,
    sender: UiSender,
    clock: Arc<dyn Clock>,
    primary: PrimaryReference,
    permission: Arc<dyn PermissionProvider>,
    hotkey: Arc<HotkeySlot>,
    debouncer: Arc<TriggerDebouncer>,
    status: Arc<Mutex<MonitorStatus>>,
}

impl GlobalInputMonitor {
    /// Create a stopped monitor that will report to `sender`.
    ///
    /// `primary` must be the same reference the engine updates on topology
    /// changes, so that pointer positions are flipped against the current
    /// primary display.
    pub fn new(
        sender: UiSender,
        clock: Arc<dyn Clock>,
        primary: PrimaryReference,
        permission: Arc<dyn PermissionProvider>,
    ) -> Self {
        Self {
            hook: Hook::new(),
            sender,
            clock,
            primary,
            permission,
            hotkey: Arc::new(HotkeySlot::default()),
            debouncer: Arc::new(TriggerDebouncer::default()),
            status: Arc::new(Mutex::new(MonitorStatus::Stopped)),
        }
    }

    /// A router sharing this monitor's hotkey binding and debounce state.
    pub fn router(&self) -> InputRouter {
        InputRouter::new(
            self.sender.clone(),
            self.clock.clone(),
            self.primary.clone(),
            self.hotkey.clone(),
            self.debouncer.clone(),
        )
    }

    fn set_status(&self, status: MonitorStatus) {
        set_status(&self.status, status);
    }

    fn degrade(&self, reason: String) -> MonitorStatus {
        log::warn!("input monitor degraded: {reason}");
        let status = MonitorStatus::Degraded(reason.clone());
        self.set_status(status.clone());
        let _ = self.sender.send(UiMessage::MonitorDegraded(reason));
        status
    }

    /// Acquire the input hook.
    ///
    /// Never fails: without permission, or if the platform refuses the hook,
    /// the monitor enters degraded mode and says so in the returned status.
    /// Calling it while running is a no-op.
    pub fn start(&self) -> MonitorStatus {
        if self.hook.is_running() {
            return self.status();
        }

        if !self.permission.input_monitoring_authorized() {
            return self.degrade("input monitoring is not authorized".into());
        }

        let status = self.status.clone();
        let sender = self.sender.clone();
        let on_failure = Box::new(move |err: Error| {
            log::warn!("input hook failed: {err}");
            set_status(&status, MonitorStatus::Degraded(err.to_string()));
            let _ = sender.send(UiMessage::MonitorDegraded(err.to_string()));
        });

        // Mark running first; a start-up failure on the hook thread may
        // overwrite this with Degraded at any point afterwards.
        self.set_status(MonitorStatus::Running);
        match self.hook.run_async(self.router(), on_failure) {
            Ok(()) => {
                log::info!("input monitor started");
                self.status()
            }
            Err(err) => self.degrade(err.to_string()),
        }
    }

    /// Release the hook. Idempotent.
    pub fn stop(&self) -> Result<()> {
        self.hook.stop()?;
        self.set_status(MonitorStatus::Stopped);
        Ok(())
    }

    /// Stop and start again, e.g. after the user granted permission.
    pub fn reacquire(&self) -> MonitorStatus {
        if let Err(err) = self.stop() {
            log::warn!("failed to stop input hook before reacquiring: {err}");
        }
        self.start()
    }

    pub fn status(&self) -> MonitorStatus {
        match self.status.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Install the spotlight hotkey, replacing any previous binding.
    pub fn register_hotkey(&self, binding: HotkeyBinding) {
        self.hotkey.set(Some(binding));
        log::debug!(
            "hotkey bound to {}#{}",
            binding.modifiers.label_prefix(),
            binding.key_code
        );
    }

    /// Same as [`register_hotkey`](Self::register_hotkey); safe while registered.
    pub fn update_hotkey(&self, binding: HotkeyBinding) {
        self.register_hotkey(binding);
    }

    pub fn unregister_hotkey(&self) {
        self.hotkey.set(None);
    }

    pub fn hotkey(&self) -> Option<HotkeyBinding> {
        self.hotkey.binding()
    }
}

fn set_status(slot: &Mutex<MonitorStatus>, status: MonitorStatus) {
    match slot.lock() {
        Ok(mut guard) => *guard = status,
        Err(poisoned) => *poisoned.into_inner() = status,
    }
}

impl Drop for GlobalInputMonitor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{UiReceiver, ui_channel};
    use crate::clock::ManualClock;
    use crate::event::{Button, PointerButton};
    use crate::geometry::Point;
    use crate::state::{MASK_CTRL, MASK_SHIFT};
    use std::time::Duration;

    const K: u32 = 40;

    struct Fixture {
        clock: ManualClock,
        hotkey: Arc<HotkeySlot>,
        router: InputRouter,
        rx: UiReceiver,
    }

    fn fixture() -> Fixture {
        let (tx, rx) = ui_channel();
        let clock = ManualClock::new();
        let hotkey = Arc::new(HotkeySlot::new(Some(HotkeyBinding::new(
            Modifiers::CTRL | Modifiers::SHIFT,
            K,
        ))));
        let router = InputRouter::new(
            tx,
            Arc::new(clock.clone()),
            PrimaryReference::new(1000.0),
            hotkey.clone(),
            Arc::new(TriggerDebouncer::default()),
        );
        Fixture {
            clock,
            hotkey,
            router,
            rx,
        }
    }

    fn drain(rx: &UiReceiver) -> Vec<UiMessage> {
        let mut out = Vec::new();
        while let Ok(Some(message)) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    fn press_hotkey(router: &InputRouter) {
        router.handle_event(&Event::key_pressed(Key::KeyK, K).with_mask(MASK_CTRL | MASK_SHIFT));
    }

    fn release_hotkey(router: &InputRouter) {
        router.handle_event(&Event::key_released(Key::KeyK, K).with_mask(MASK_CTRL | MASK_SHIFT));
    }

    fn triggers(messages: &[UiMessage]) -> usize {
        messages
            .iter()
            .filter(|m| matches!(m, UiMessage::HotkeyTriggered(_)))
            .count()
    }

    #[test]
    fn test_pointer_positions_normalized() {
        let f = fixture();
        f.router.handle_event(&Event::mouse_moved(10.0, 100.0).with_mask(0));
        f.router
            .handle_event(&Event::mouse_pressed(Button::Right, 20.0, 0.0).with_mask(0));

        let messages = drain(&f.rx);
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            UiMessage::Pointer(e) => {
                assert_eq!(e.kind, PointerKind::Move);
                assert_eq!(e.position, Point::new(10.0, 900.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &messages[1] {
            UiMessage::Pointer(e) => {
                assert_eq!(e.kind, PointerKind::ButtonDown(PointerButton::Secondary));
                assert_eq!(e.position, Point::new(20.0, 1000.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_delivery_within_window_suppressed() {
        let f = fixture();
        press_hotkey(&f.router);
        release_hotkey(&f.router);
        f.clock.advance(Duration::from_millis(120));
        press_hotkey(&f.router);
        release_hotkey(&f.router);

        assert_eq!(triggers(&drain(&f.rx)), 1);
    }

    #[test]
    fn test_triggers_outside_window_each_delivered() {
        let f = fixture();
        for _ in 0..3 {
            press_hotkey(&f.router);
            release_hotkey(&f.router);
            f.clock.advance(Duration::from_millis(300));
        }
        assert_eq!(triggers(&drain(&f.rx)), 3);
    }

    #[test]
    fn test_held_hotkey_rearms_on_release() {
        let f = fixture();
        press_hotkey(&f.router);
        f.clock.advance(Duration::from_secs(1));
        // Auto-repeat.
        press_hotkey(&f.router);
        assert_eq!(triggers(&drain(&f.rx)), 1);

        release_hotkey(&f.router);
        f.clock.advance(Duration::from_secs(1));
        press_hotkey(&f.router);
        assert_eq!(triggers(&drain(&f.rx)), 1);
    }

    #[test]
    fn test_hook_reenable_rearms_held_hotkey() {
        let f = fixture();
        press_hotkey(&f.router);
        // The release is lost while the OS has the hook disabled.
        f.router.handle_event(&Event::hook_reenabled());
        f.clock.advance(Duration::from_secs(5));
        press_hotkey(&f.router);
        assert_eq!(triggers(&drain(&f.rx)), 2);
    }

    #[test]
    fn test_hook_enable_rearms_held_hotkey() {
        let f = fixture();
        press_hotkey(&f.router);
        assert!(f.hotkey.is_held());
        f.router.handle_event(&Event::hook_enabled());
        assert!(!f.hotkey.is_held());
    }

    #[test]
    fn test_rebind_while_held_rearms() {
        let f = fixture();
        press_hotkey(&f.router);
        f.hotkey
            .set(Some(HotkeyBinding::new(Modifiers::CTRL | Modifiers::SHIFT, K)));
        f.clock.advance(Duration::from_secs(1));
        press_hotkey(&f.router);
        assert_eq!(triggers(&drain(&f.rx)), 2);
    }

    #[test]
    fn test_wrong_modifiers_are_a_keystroke() {
        let f = fixture();
        f.router
            .handle_event(&Event::key_pressed(Key::KeyK, K).with_mask(MASK_CTRL));
        let messages = drain(&f.rx);
        assert_eq!(triggers(&messages), 0);
        assert!(matches!(
            &messages[..],
            [UiMessage::Keystroke { label, .. }] if label == "Ctrl+K"
        ));
    }

    #[test]
    fn test_escape_and_modifier_keys() {
        let f = fixture();
        f.router
            .handle_event(&Event::key_pressed(Key::ShiftLeft, 50).with_mask(0));
        f.router
            .handle_event(&Event::key_pressed(Key::Escape, 9).with_mask(0));

        let messages = drain(&f.rx);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], UiMessage::EscapePressed);
        assert!(matches!(&messages[1], UiMessage::Keystroke { label, .. } if label == "Esc"));
    }

    #[test]
    fn test_trigger_stamped_at_receipt() {
        let f = fixture();
        f.clock.advance(Duration::from_millis(777));
        press_hotkey(&f.router);
        assert_eq!(
            drain(&f.rx),
            vec![UiMessage::HotkeyTriggered(Timestamp::from_millis(777))]
        );
    }

    #[test]
    fn test_unauthorized_start_is_degraded() {
        let (tx, rx) = ui_channel();
        let monitor = GlobalInputMonitor::new(
            tx,
            Arc::new(ManualClock::new()),
            PrimaryReference::default(),
            Arc::new(|| false),
        );
        assert!(matches!(monitor.start(), MonitorStatus::Degraded(_)));
        assert!(matches!(rx.try_recv(), Ok(Some(UiMessage::MonitorDegraded(_)))));

        monitor.stop().unwrap();
        monitor.stop().unwrap();
        assert_eq!(monitor.status(), MonitorStatus::Stopped);
    }

    #[test]
    fn test_update_hotkey_replaces_binding() {
        let (tx, _rx) = ui_channel();
        let monitor = GlobalInputMonitor::new(
            tx,
            Arc::new(ManualClock::new()),
            PrimaryReference::default(),
            Arc::new(AlwaysAuthorized),
        );
        let first = HotkeyBinding::new(Modifiers::CTRL, 1);
        let second = HotkeyBinding::new(Modifiers::ALT, 2);
        monitor.register_hotkey(first);
        monitor.router().handle_event(
            &Event::key_pressed(Key::KeyA, 1).with_mask(MASK_CTRL),
        );
        assert!(monitor.hotkey.is_held());
        monitor.update_hotkey(second);
        assert!(!monitor.hotkey.is_held());
        monitor.update_hotkey(second);
        assert_eq!(monitor.hotkey(), Some(second));
        monitor.unregister_hotkey();
        assert_eq!(monitor.hotkey(), None);
    }
}

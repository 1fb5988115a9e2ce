//! Raw hook events and the normalized events handed to the UI thread.

use crate::clock::Timestamp;
use crate::geometry::Point;
use crate::keycode::Key;

/// The type of raw input event reported by a platform hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Hook has been enabled and is now listening.
    HookEnabled,
    /// Hook has been disabled and is no longer listening.
    HookDisabled,
    /// The OS disabled the hook (timeout or input-storm protection) and it
    /// was switched back on from inside the callback.
    HookReenabled,

    /// A key was pressed down.
    KeyPressed,
    /// A key was released.
    KeyReleased,

    /// A mouse button was pressed.
    MousePressed,
    /// A mouse button was released.
    MouseReleased,
    /// The mouse was moved (no buttons held).
    MouseMoved,
    /// The mouse was moved while a button was held (drag).
    MouseDragged,
}

/// Mouse button identifiers as the platform reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Right,
    Middle,
    Button4,
    Button5,
    Unknown(u8),
}

/// Keyboard event data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardData {
    /// The virtual key.
    pub key: Key,
    /// The raw platform-specific keycode.
    pub raw_code: u32,
}

/// Mouse event data, in hook space.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseData {
    /// The mouse button (for press/release events).
    pub button: Option<Button>,
    pub x: f64,
    pub y: f64,
}

/// A raw input event, exactly as one hook callback produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: EventType,
    /// Modifier/button mask held when the event occurred.
    pub mask: u32,
    pub keyboard: Option<KeyboardData>,
    pub mouse: Option<MouseData>,
}

impl Event {
    /// Create a new event of the given type, capturing the current held mask.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            mask: crate::state::get_mask(),
            keyboard: None,
            mouse: None,
        }
    }

    /// Replace the captured modifier/button mask.
    pub fn with_mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }

    pub fn hook_enabled() -> Self {
        Self::new(EventType::HookEnabled)
    }

    pub fn hook_disabled() -> Self {
        Self::new(EventType::HookDisabled)
    }

    pub fn hook_reenabled() -> Self {
        Self::new(EventType::HookReenabled)
    }

    pub fn key_pressed(key: Key, raw_code: u32) -> Self {
        let mut event = Self::new(EventType::KeyPressed);
        event.keyboard = Some(KeyboardData { key, raw_code });
        event
    }

    pub fn key_released(key: Key, raw_code: u32) -> Self {
        let mut event = Self::new(EventType::KeyReleased);
        event.keyboard = Some(KeyboardData { key, raw_code });
        event
    }

    pub fn mouse_pressed(button: Button, x: f64, y: f64) -> Self {
        Self::with_mouse(EventType::MousePressed, Some(button), x, y)
    }

    pub fn mouse_released(button: Button, x: f64, y: f64) -> Self {
        Self::with_mouse(EventType::MouseReleased, Some(button), x, y)
    }

    pub fn mouse_moved(x: f64, y: f64) -> Self {
        Self::with_mouse(EventType::MouseMoved, None, x, y)
    }

    pub fn mouse_dragged(x: f64, y: f64) -> Self {
        Self::with_mouse(EventType::MouseDragged, None, x, y)
    }

    fn with_mouse(event_type: EventType, button: Option<Button>, x: f64, y: f64) -> Self {
        let mut event = Self::new(event_type);
        event.mouse = Some(MouseData { button, x, y });
        event
    }

    /// Hook-space position of a mouse event.
    pub fn position(&self) -> Option<Point> {
        self.mouse.as_ref().map(|m| Point::new(m.x, m.y))
    }
}

/// Which button went down, as far as the overlay distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

impl From<Button> for PointerButton {
    fn from(button: Button) -> Self {
        match button {
            Button::Left => PointerButton::Primary,
            Button::Right => PointerButton::Secondary,
            _ => PointerButton::Other,
        }
    }
}

/// What a normalized pointer event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Move,
    ButtonDown(PointerButton),
}

/// A pointer event in virtual-desktop space, stamped when the hook saw it.
///
/// Produced per hook callback and consumed immediately by the UI thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPointerEvent {
    pub kind: PointerKind,
    pub position: Point,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_mapping() {
        assert_eq!(PointerButton::from(Button::Left), PointerButton::Primary);
        assert_eq!(PointerButton::from(Button::Right), PointerButton::Secondary);
        assert_eq!(PointerButton::from(Button::Middle), PointerButton::Other);
        assert_eq!(PointerButton::from(Button::Unknown(9)), PointerButton::Other);
    }

    #[test]
    fn test_mouse_event_position() {
        let event = Event::mouse_pressed(Button::Left, 12.0, 34.0).with_mask(0);
        assert_eq!(event.position(), Some(Point::new(12.0, 34.0)));
        assert_eq!(event.mask, 0);
        assert!(Event::key_pressed(Key::KeyA, 38).position().is_none());
    }
}

//! Virtual key definitions.
//!
//! Only the keys the overlay cares about get a variant: anything that can be
//! shown as a keystroke label, the modifiers, and Escape. Everything else is
//! carried as [`Key::Unknown`] with the raw platform code.

use crate::state::{MASK_ALT, MASK_CTRL, MASK_META, MASK_SHIFT};

/// Virtual key codes for keyboard keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,

    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    MetaLeft, // Windows/Command/Super
    MetaRight,

    Escape,
    Tab,
    CapsLock,
    Space,
    Enter,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    Grave,
    Minus,
    Equal,
    BracketLeft,
    BracketRight,
    Backslash,
    Semicolon,
    Quote,
    Comma,
    Period,
    Slash,

    /// Unknown key with the raw platform code.
    Unknown(u32),
}

const LETTERS: [Key; 26] = [
    Key::KeyA,
    Key::KeyB,
    Key::KeyC,
    Key::KeyD,
    Key::KeyE,
    Key::KeyF,
    Key::KeyG,
    Key::KeyH,
    Key::KeyI,
    Key::KeyJ,
    Key::KeyK,
    Key::KeyL,
    Key::KeyM,
    Key::KeyN,
    Key::KeyO,
    Key::KeyP,
    Key::KeyQ,
    Key::KeyR,
    Key::KeyS,
    Key::KeyT,
    Key::KeyU,
    Key::KeyV,
    Key::KeyW,
    Key::KeyX,
    Key::KeyY,
    Key::KeyZ,
];

const DIGITS: [Key; 10] = [
    Key::Num0,
    Key::Num1,
    Key::Num2,
    Key::Num3,
    Key::Num4,
    Key::Num5,
    Key::Num6,
    Key::Num7,
    Key::Num8,
    Key::Num9,
];

const FUNCTION_KEYS: [Key; 12] = [
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
];

impl Key {
    /// Letter key for `index` 0..26 (`A`..`Z`).
    pub fn letter(index: usize) -> Option<Key> {
        LETTERS.get(index).copied()
    }

    /// Top-row digit key for `digit` 0..10.
    pub fn digit(digit: usize) -> Option<Key> {
        DIGITS.get(digit).copied()
    }

    /// Function key `F{n}` for `n` 1..=12.
    pub fn function(n: usize) -> Option<Key> {
        n.checked_sub(1).and_then(|i| FUNCTION_KEYS.get(i).copied())
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        self.modifier_mask() != 0
    }

    /// The modifier mask bit this key toggles, or 0.
    pub fn modifier_mask(&self) -> u32 {
        match self {
            Key::ShiftLeft | Key::ShiftRight => MASK_SHIFT,
            Key::ControlLeft | Key::ControlRight => MASK_CTRL,
            Key::AltLeft | Key::AltRight => MASK_ALT,
            Key::MetaLeft | Key::MetaRight => MASK_META,
            _ => 0,
        }
    }

    /// Short label for on-screen keystroke display.
    pub fn label(&self) -> String {
        if let Some(i) = LETTERS.iter().position(|k| k == self) {
            return char::from(b'A' + i as u8).to_string();
        }
        if let Some(i) = DIGITS.iter().position(|k| k == self) {
            return i.to_string();
        }
        if let Some(i) = FUNCTION_KEYS.iter().position(|k| k == self) {
            return format!("F{}", i + 1);
        }
        let label = match self {
            Key::ShiftLeft | Key::ShiftRight => "Shift",
            Key::ControlLeft | Key::ControlRight => "Ctrl",
            Key::AltLeft | Key::AltRight => "Alt",
            Key::MetaLeft | Key::MetaRight => "Meta",
            Key::Escape => "Esc",
            Key::Tab => "Tab",
            Key::CapsLock => "Caps",
            Key::Space => "Space",
            Key::Enter => "Enter",
            Key::Backspace => "Backspace",
            Key::Delete => "Del",
            Key::Home => "Home",
            Key::End => "End",
            Key::PageUp => "PgUp",
            Key::PageDown => "PgDn",
            Key::ArrowUp => "Up",
            Key::ArrowDown => "Down",
            Key::ArrowLeft => "Left",
            Key::ArrowRight => "Right",
            Key::Grave => "`",
            Key::Minus => "-",
            Key::Equal => "=",
            Key::BracketLeft => "[",
            Key::BracketRight => "]",
            Key::Backslash => "\\",
            Key::Semicolon => ";",
            Key::Quote => "'",
            Key::Comma => ",",
            Key::Period => ".",
            Key::Slash => "/",
            Key::Unknown(code) => return format!("#{code}"),
            _ => "?",
        };
        label.to_string()
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::Unknown(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Key::KeyK.label(), "K");
        assert_eq!(Key::Num7.label(), "7");
        assert_eq!(Key::F11.label(), "F11");
        assert_eq!(Key::Escape.label(), "Esc");
        assert_eq!(Key::Unknown(200).label(), "#200");
    }

    #[test]
    fn test_modifier_detection() {
        assert!(Key::ShiftRight.is_modifier());
        assert_eq!(Key::MetaLeft.modifier_mask(), MASK_META);
        assert!(!Key::KeyA.is_modifier());
    }

    #[test]
    fn test_constructors() {
        assert_eq!(Key::letter(25), Some(Key::KeyZ));
        assert_eq!(Key::letter(26), None);
        assert_eq!(Key::digit(0), Some(Key::Num0));
        assert_eq!(Key::function(12), Some(Key::F12));
        assert_eq!(Key::function(0), None);
    }
}

//! X11 keycode to [`Key`] mapping (QWERTY layout; X11 keycode = evdev + 8).

use crate::keycode::Key;

/// X11 keycode of the Escape key.
pub const ESCAPE: u32 = 9;

/// Convert an X11 keycode to our Key enum.
pub fn keycode_to_key(code: u32) -> Key {
    match code {
        // Letters
        38 => Key::KeyA,
        56 => Key::KeyB,
        54 => Key::KeyC,
        40 => Key::KeyD,
        26 => Key::KeyE,
        41 => Key::KeyF,
        42 => Key::KeyG,
        43 => Key::KeyH,
        31 => Key::KeyI,
        44 => Key::KeyJ,
        45 => Key::KeyK,
        46 => Key::KeyL,
        58 => Key::KeyM,
        57 => Key::KeyN,
        32 => Key::KeyO,
        33 => Key::KeyP,
        24 => Key::KeyQ,
        27 => Key::KeyR,
        39 => Key::KeyS,
        28 => Key::KeyT,
        30 => Key::KeyU,
        55 => Key::KeyV,
        25 => Key::KeyW,
        53 => Key::KeyX,
        29 => Key::KeyY,
        52 => Key::KeyZ,

        // Top-row digits run 1..9 then 0
        10..=18 => Key::digit((code - 9) as usize).unwrap_or(Key::Unknown(code)),
        19 => Key::Num0,

        // Function keys
        67..=76 => Key::function((code - 66) as usize).unwrap_or(Key::Unknown(code)),
        95 => Key::F11,
        96 => Key::F12,

        // Modifiers
        50 => Key::ShiftLeft,
        62 => Key::ShiftRight,
        37 => Key::ControlLeft,
        105 => Key::ControlRight,
        64 => Key::AltLeft,
        108 => Key::AltRight,
        133 => Key::MetaLeft,
        134 => Key::MetaRight,

        // Navigation and editing
        ESCAPE => Key::Escape,
        22 => Key::Backspace,
        23 => Key::Tab,
        36 => Key::Enter,
        66 => Key::CapsLock,
        65 => Key::Space,
        112 => Key::PageUp,
        117 => Key::PageDown,
        115 => Key::End,
        110 => Key::Home,
        113 => Key::ArrowLeft,
        111 => Key::ArrowUp,
        114 => Key::ArrowRight,
        116 => Key::ArrowDown,
        119 => Key::Delete,

        // Punctuation
        49 => Key::Grave,
        20 => Key::Minus,
        21 => Key::Equal,
        34 => Key::BracketLeft,
        35 => Key::BracketRight,
        51 => Key::Backslash,
        47 => Key::Semicolon,
        48 => Key::Quote,
        59 => Key::Comma,
        60 => Key::Period,
        61 => Key::Slash,

        _ => Key::Unknown(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_and_function_ranges() {
        assert_eq!(keycode_to_key(10), Key::Num1);
        assert_eq!(keycode_to_key(18), Key::Num9);
        assert_eq!(keycode_to_key(19), Key::Num0);
        assert_eq!(keycode_to_key(67), Key::F1);
        assert_eq!(keycode_to_key(76), Key::F10);
        assert_eq!(keycode_to_key(96), Key::F12);
    }

    #[test]
    fn test_escape_and_unknown() {
        assert_eq!(keycode_to_key(ESCAPE), Key::Escape);
        assert_eq!(keycode_to_key(250), Key::Unknown(250));
    }
}

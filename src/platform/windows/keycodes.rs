//! Windows virtual-key code to [`Key`] mapping.

use crate::keycode::Key;

/// `VK_ESCAPE`.
pub const ESCAPE: u32 = 0x1B;

/// Convert a Windows virtual-key code to our Key enum.
pub fn keycode_to_key(code: u32) -> Key {
    match code {
        // 'A'..='Z' and '0'..='9' share their ASCII values.
        0x41..=0x5A => Key::letter((code - 0x41) as usize).unwrap_or(Key::Unknown(code)),
        0x30..=0x39 => Key::digit((code - 0x30) as usize).unwrap_or(Key::Unknown(code)),
        0x70..=0x7B => Key::function((code - 0x6F) as usize).unwrap_or(Key::Unknown(code)),

        0xA0 | 0x10 => Key::ShiftLeft,
        0xA1 => Key::ShiftRight,
        0xA2 | 0x11 => Key::ControlLeft,
        0xA3 => Key::ControlRight,
        0xA4 | 0x12 => Key::AltLeft,
        0xA5 => Key::AltRight,
        0x5B => Key::MetaLeft,
        0x5C => Key::MetaRight,

        ESCAPE => Key::Escape,
        0x09 => Key::Tab,
        0x14 => Key::CapsLock,
        0x20 => Key::Space,
        0x0D => Key::Enter,
        0x08 => Key::Backspace,
        0x2E => Key::Delete,
        0x24 => Key::Home,
        0x23 => Key::End,
        0x21 => Key::PageUp,
        0x22 => Key::PageDown,
        0x26 => Key::ArrowUp,
        0x28 => Key::ArrowDown,
        0x25 => Key::ArrowLeft,
        0x27 => Key::ArrowRight,

        0xC0 => Key::Grave,
        0xBD => Key::Minus,
        0xBB => Key::Equal,
        0xDB => Key::BracketLeft,
        0xDD => Key::BracketRight,
        0xDC => Key::Backslash,
        0xBA => Key::Semicolon,
        0xDE => Key::Quote,
        0xBC => Key::Comma,
        0xBE => Key::Period,
        0xBF => Key::Slash,

        c => Key::Unknown(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(keycode_to_key(0x4B), Key::KeyK);
        assert_eq!(keycode_to_key(0x30), Key::Num0);
        assert_eq!(keycode_to_key(0x7B), Key::F12);
        assert_eq!(keycode_to_key(ESCAPE), Key::Escape);
        assert_eq!(keycode_to_key(0xFF), Key::Unknown(0xFF));
    }
}

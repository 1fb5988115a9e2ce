//! Held modifier and button state.
//!
//! Raw hook callbacks only see one transition at a time. This module keeps a
//! process-wide mask of what is currently held so that key presses can be
//! matched against hotkey modifiers and moves can be told apart from drags.

use std::sync::atomic::{AtomicU32, Ordering};

/// Global modifier/button mask - persists across events.
static HELD_MASK: AtomicU32 = AtomicU32::new(0);

/// Shift key mask.
pub const MASK_SHIFT: u32 = 1 << 0;
/// Control key mask.
pub const MASK_CTRL: u32 = 1 << 1;
/// Alt/Option key mask.
pub const MASK_ALT: u32 = 1 << 2;
/// Meta/Command/Windows key mask.
pub const MASK_META: u32 = 1 << 3;

/// Primary (left) mouse button mask.
pub const MASK_BUTTON1: u32 = 1 << 8;
/// Secondary (right) mouse button mask.
pub const MASK_BUTTON2: u32 = 1 << 9;
/// Middle mouse button mask.
pub const MASK_BUTTON3: u32 = 1 << 10;
/// Extra button 1 (X1) mask.
pub const MASK_BUTTON4: u32 = 1 << 11;
/// Extra button 2 (X2) mask.
pub const MASK_BUTTON5: u32 = 1 << 12;

/// All button masks combined.
pub const MASK_ALL_BUTTONS: u32 =
    MASK_BUTTON1 | MASK_BUTTON2 | MASK_BUTTON3 | MASK_BUTTON4 | MASK_BUTTON5;

/// All modifier masks combined.
pub const MASK_ALL_MODIFIERS: u32 = MASK_SHIFT | MASK_CTRL | MASK_ALT | MASK_META;

/// A set of keyboard modifiers, as used by hotkey bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(MASK_SHIFT);
    pub const CTRL: Modifiers = Modifiers(MASK_CTRL);
    pub const ALT: Modifiers = Modifiers(MASK_ALT);
    pub const META: Modifiers = Modifiers(MASK_META);

    /// Build from a raw mask; non-modifier bits are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        Modifiers(bits & MASK_ALL_MODIFIERS)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub const fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Human-readable prefix such as `Ctrl+Shift+`.
    pub fn label_prefix(&self) -> String {
        let mut out = String::new();
        for (flag, name) in [
            (Modifiers::CTRL, "Ctrl+"),
            (Modifiers::ALT, "Alt+"),
            (Modifiers::SHIFT, "Shift+"),
            (Modifiers::META, "Meta+"),
        ] {
            if self.contains(flag) {
                out.push_str(name);
            }
        }
        out
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        self.union(rhs)
    }
}

/// Set bits in the global mask.
#[inline]
pub fn set_mask(mask: u32) {
    HELD_MASK.fetch_or(mask, Ordering::SeqCst);
}

/// Clear bits in the global mask.
#[inline]
pub fn unset_mask(mask: u32) {
    HELD_MASK.fetch_and(!mask, Ordering::SeqCst);
}

/// Get the current mask value.
#[inline]
pub fn get_mask() -> u32 {
    HELD_MASK.load(Ordering::SeqCst)
}

/// Reset the mask to zero.
#[inline]
pub fn reset_mask() {
    HELD_MASK.store(0, Ordering::SeqCst);
}

/// Replace only the modifier bits, keeping held buttons.
#[inline]
pub fn replace_modifiers(modifiers: u32) {
    let _ = HELD_MASK.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
        Some((current & !MASK_ALL_MODIFIERS) | (modifiers & MASK_ALL_MODIFIERS))
    });
}

/// Currently held modifiers.
#[inline]
pub fn held_modifiers() -> Modifiers {
    Modifiers::from_bits(get_mask())
}

/// Check if any mouse button is currently held.
#[inline]
pub fn is_button_held() -> bool {
    (get_mask() & MASK_ALL_BUTTONS) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_ignore_button_bits() {
        let m = Modifiers::from_bits(MASK_CTRL | MASK_BUTTON1);
        assert_eq!(m, Modifiers::CTRL);
    }

    #[test]
    fn test_modifier_label_prefix_order() {
        let m = Modifiers::SHIFT | Modifiers::CTRL;
        assert_eq!(m.label_prefix(), "Ctrl+Shift+");
        assert_eq!(Modifiers::NONE.label_prefix(), "");
    }

    #[test]
    fn test_contains() {
        let m = Modifiers::META | Modifiers::ALT;
        assert!(m.contains(Modifiers::META));
        assert!(!m.contains(Modifiers::SHIFT));
        assert!(m.contains(Modifiers::NONE));
    }

    // The global mask is shared by every test in the process, so all of its
    // transitions are checked in one test.
    #[test]
    fn test_global_mask_transitions() {
        reset_mask();
        assert!(!is_button_held());

        set_mask(MASK_BUTTON1 | MASK_SHIFT);
        assert!(is_button_held());
        assert_eq!(held_modifiers(), Modifiers::SHIFT);

        replace_modifiers(MASK_CTRL);
        assert_eq!(held_modifiers(), Modifiers::CTRL);
        assert!(is_button_held());

        unset_mask(MASK_BUTTON1);
        assert!(!is_button_held());

        reset_mask();
        assert!(held_modifiers().is_empty());
    }
}

//! macOS implementation using CGEventTap, CoreGraphics display queries and
//! AppKit overlay windows.

mod display;
mod keycodes;
mod listen;
mod overlay;

pub use display::{cursor_position, displays};
pub use listen::{run_hook, stop_hook};
pub use overlay::OverlayBackend;

//! X11 implementation using XRecord for input, Xlib for queries and
//! override-redirect ARGB windows for overlays.

mod display;
mod listen;
mod overlay;

pub use display::{cursor_position, displays};
pub use listen::{run_hook, stop_hook};
pub use overlay::OverlayBackend;

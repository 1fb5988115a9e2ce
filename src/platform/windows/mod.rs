//! Windows implementation using low-level hooks, GDI monitor enumeration and
//! layered overlay windows.

mod display;
mod keycodes;
mod listen;
mod overlay;

pub use display::{cursor_position, displays};
pub use listen::{run_hook, stop_hook};
pub use overlay::OverlayBackend;

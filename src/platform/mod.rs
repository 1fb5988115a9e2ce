//! Platform-specific hook, display and cursor implementations.
//!
//! Every backend exposes the same free functions:
//! `run_hook`, `stop_hook`, `displays` and `cursor_position`, plus an
//! `OverlayBackend` implementing [`crate::surface::SurfaceBackend`].
//! Positions and display bounds are reported in hook space (top-left origin,
//! Y down).

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::*;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use windows::*;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::*;

// Ensure at least one platform is supported
#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
compile_error!("limelight only supports macOS, Windows, and Linux");

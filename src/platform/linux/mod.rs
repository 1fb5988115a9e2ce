//! Linux platform implementation.
//!
//! Input capture, display queries and overlay windows go through X11
//! (XRecord, Xlib, XFixes) when the default `x11` feature is enabled. Without
//! it every entry point reports `NotSupported`, which the input monitor
//! treats as degraded mode.

#[cfg(feature = "x11")]
mod keycodes;

#[cfg(feature = "x11")]
mod x11;

#[cfg(feature = "x11")]
pub use x11::*;

#[cfg(not(feature = "x11"))]
mod stub {
    use crate::display::DisplayInfo;
    use crate::error::{Error, Result};
    use crate::geometry::Point;
    use crate::hook::EventHandler;
    use crate::surface::{OverlaySurface, SurfaceBackend, SurfaceConfig};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn unsupported() -> Error {
        Error::NotSupported("No Linux backend enabled. Enable the 'x11' feature.".into())
    }

    pub fn run_hook<H: EventHandler + 'static>(
        _running: &Arc<AtomicBool>,
        _handler: H,
    ) -> Result<()> {
        Err(unsupported())
    }

    pub fn stop_hook() -> Result<()> {
        Ok(())
    }

    pub fn displays() -> Result<Vec<DisplayInfo>> {
        Err(unsupported())
    }

    pub fn cursor_position() -> Result<Point> {
        Err(unsupported())
    }

    /// Never constructed; hosts fall back to the headless backend.
    pub struct OverlayBackend;

    impl OverlayBackend {
        pub fn new() -> Result<Self> {
            Err(unsupported())
        }
    }

    impl SurfaceBackend for OverlayBackend {
        fn create_surface(&mut self, _config: &SurfaceConfig) -> Result<Box<dyn OverlaySurface>> {
            Err(unsupported())
        }
    }
}

#[cfg(not(feature = "x11"))]
pub use stub::*;

//! X11 display and cursor queries.

use crate::display::DisplayInfo;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use std::os::raw::c_int;
use std::ptr::null;
use x11::xlib;

/// The default screen as a single display.
///
/// Core Xlib only knows the combined root window; per-monitor geometry would
/// need RandR, so multi-head X setups present as one large display.
pub fn displays() -> Result<Vec<DisplayInfo>> {
    with_display(|display| unsafe {
        let screen = xlib::XDefaultScreen(display);
        let width = xlib::XDisplayWidth(display, screen) as f64;
        let height = xlib::XDisplayHeight(display, screen) as f64;

        Ok(vec![DisplayInfo {
            id: 1,
            bounds: Rect::new(0.0, 0.0, width, height),
            scale_factor: 1.0,
            refresh_rate: None,
            is_primary: true,
        }])
    })
}

/// Current pointer position on the root window.
pub fn cursor_position() -> Result<Point> {
    with_display(|display| unsafe {
        let screen = xlib::XDefaultScreen(display);
        let root = xlib::XRootWindow(display, screen);

        let mut root_return = 0u64;
        let mut child_return = 0u64;
        let mut root_x: c_int = 0;
        let mut root_y: c_int = 0;
        let mut win_x: c_int = 0;
        let mut win_y: c_int = 0;
        let mut mask: u32 = 0;

        let result = xlib::XQueryPointer(
            display,
            root,
            &mut root_return,
            &mut child_return,
            &mut root_x,
            &mut root_y,
            &mut win_x,
            &mut win_y,
            &mut mask,
        );

        if result == 0 {
            Err(Error::Platform("XQueryPointer failed".into()))
        } else {
            Ok(Point::new(root_x as f64, root_y as f64))
        }
    })
}

fn with_display<T>(f: impl FnOnce(*mut xlib::Display) -> Result<T>) -> Result<T> {
    unsafe {
        let display = xlib::XOpenDisplay(null());
        if display.is_null() {
            return Err(Error::Platform("XOpenDisplay failed".into()));
        }
        let result = f(display);
        xlib::XCloseDisplay(display);
        result
    }
}

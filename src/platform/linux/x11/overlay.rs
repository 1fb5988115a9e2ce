//! X11 overlay surfaces: override-redirect ARGB windows with an empty input
//! shape.
//!
//! Translucency needs a 32-bit TrueColor visual and a running compositor.
//! Servers without one refuse surface creation rather than painting an
//! opaque black sheet over the desktop. Frames are blitted with `XPutImage`
//! from the canvas; fades scale the premultiplied pixels and re-blit, since
//! core X has no per-window opacity.

use crate::error::{Error, Result};
use crate::paint::Frame;
use crate::render::{Canvas, LabelFont};
use crate::surface::{OverlaySurface, SurfaceBackend, SurfaceConfig};
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr::{null, null_mut};
use std::rc::Rc;
use x11::xfixes;
use x11::xlib;

/// `ShapeInput` from the X Shape extension.
const SHAPE_INPUT: c_int = 2;

/// An open Xlib connection shared by every surface of one backend.
struct Connection {
    display: *mut xlib::Display,
    screen: c_int,
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe {
            xlib::XCloseDisplay(self.display);
        }
    }
}

/// Creates one override-redirect window per display.
pub struct OverlayBackend {
    connection: Rc<Connection>,
    font: Option<LabelFont>,
}

impl OverlayBackend {
    /// Open a connection to the default X display.
    pub fn new() -> Result<Self> {
        let display = unsafe { xlib::XOpenDisplay(null()) };
        if display.is_null() {
            return Err(Error::NotSupported("cannot open X display".into()));
        }
        let screen = unsafe { xlib::XDefaultScreen(display) };
        Ok(Self {
            connection: Rc::new(Connection { display, screen }),
            font: LabelFont::system(),
        })
    }
}

impl SurfaceBackend for OverlayBackend {
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn OverlaySurface>> {
        Ok(Box::new(OverlayWindow::create(
            Rc::clone(&self.connection),
            config,
            self.font.clone(),
        )?))
    }

    fn pump(&mut self) {
        let display = self.connection.display;
        unsafe {
            // Override-redirect windows select no input; drain whatever the
            // server still queues (expose, mapping) so it does not pile up.
            let mut event: xlib::XEvent = std::mem::zeroed();
            while xlib::XPending(display) > 0 {
                xlib::XNextEvent(display, &mut event);
            }
        }
    }
}

struct OverlayWindow {
    connection: Rc<Connection>,
    window: xlib::Window,
    colormap: xlib::Colormap,
    gc: xlib::GC,
    visual: *mut xlib::Visual,
    canvas: Canvas,
    buffer: Vec<u8>,
    opacity: f64,
}

impl OverlayWindow {
    fn create(
        connection: Rc<Connection>,
        config: &SurfaceConfig,
        font: Option<LabelFont>,
    ) -> Result<Self> {
        let display = connection.display;
        let bounds = config.native_bounds;
        let width = bounds.width.round().max(1.0) as u32;
        let height = bounds.height.round().max(1.0) as u32;
        let canvas = Canvas::new(width as usize, height as usize)
            .ok_or_else(|| Error::SurfaceCreation(format!("bad size {width}x{height}")))?
            .with_font(font);

        unsafe {
            let root = xlib::XRootWindow(display, connection.screen);

            let mut info: xlib::XVisualInfo = std::mem::zeroed();
            if xlib::XMatchVisualInfo(display, connection.screen, 32, xlib::TrueColor, &mut info)
                == 0
            {
                return Err(Error::SurfaceCreation(
                    "no 32-bit TrueColor visual; a compositing manager is required".into(),
                ));
            }

            let colormap = xlib::XCreateColormap(display, root, info.visual, xlib::AllocNone);
            let mut attributes: xlib::XSetWindowAttributes = std::mem::zeroed();
            attributes.override_redirect = xlib::True;
            attributes.colormap = colormap;
            attributes.border_pixel = 0;
            attributes.background_pixel = 0;
            let mask = xlib::CWOverrideRedirect
                | xlib::CWColormap
                | xlib::CWBorderPixel
                | xlib::CWBackPixel;

            let window = xlib::XCreateWindow(
                display,
                root,
                bounds.x.round() as c_int,
                bounds.y.round() as c_int,
                width as c_uint,
                height as c_uint,
                0,
                info.depth,
                xlib::InputOutput as c_uint,
                info.visual,
                mask,
                &mut attributes,
            );
            if window == 0 {
                xlib::XFreeColormap(display, colormap);
                return Err(Error::SurfaceCreation("XCreateWindow failed".into()));
            }

            if config.click_through {
                let region = xfixes::XFixesCreateRegion(display, null_mut(), 0);
                xfixes::XFixesSetWindowShapeRegion(display, window, SHAPE_INPUT, 0, 0, region);
                xfixes::XFixesDestroyRegion(display, region);
            }

            let gc = xlib::XCreateGC(display, window, 0, null_mut());
            xlib::XFlush(display);

            log::debug!(
                "x11 overlay for display {} at {:?}",
                config.display_id,
                bounds
            );
            Ok(Self {
                connection,
                window,
                colormap,
                gc,
                visual: info.visual,
                canvas,
                buffer: vec![0; width as usize * height as usize * 4],
                opacity: 0.0,
            })
        }
    }

    fn blit(&mut self) -> Result<()> {
        self.canvas.write_bgra(&mut self.buffer, self.opacity);
        let display = self.connection.display;
        let width = self.canvas.width() as c_uint;
        let height = self.canvas.height() as c_uint;
        unsafe {
            let image = xlib::XCreateImage(
                display,
                self.visual,
                32,
                xlib::ZPixmap,
                0,
                self.buffer.as_mut_ptr() as *mut c_char,
                width,
                height,
                32,
                0,
            );
            if image.is_null() {
                return Err(Error::Platform("XCreateImage failed".into()));
            }
            xlib::XPutImage(
                display,
                self.window,
                self.gc,
                image,
                0,
                0,
                0,
                0,
                width,
                height,
            );
            // The pixels belong to `buffer`; keep XDestroyImage off them.
            (*image).data = null_mut();
            xlib::XDestroyImage(image);
            xlib::XFlush(display);
        }
        Ok(())
    }
}

impl OverlaySurface for OverlayWindow {
    fn set_visible(&mut self, visible: bool) {
        let display = self.connection.display;
        unsafe {
            if visible {
                xlib::XMapRaised(display, self.window);
            } else {
                xlib::XUnmapWindow(display, self.window);
            }
            xlib::XFlush(display);
        }
    }

    fn set_opacity(&mut self, opacity: f64) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity == self.opacity {
            return;
        }
        self.opacity = opacity;
        if let Err(err) = self.blit() {
            log::debug!("{err}");
        }
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.canvas.clear();
        self.canvas.render(frame);
        self.blit()
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        let display = self.connection.display;
        unsafe {
            xlib::XFreeGC(display, self.gc);
            xlib::XDestroyWindow(display, self.window);
            xlib::XFreeColormap(display, self.colormap);
            xlib::XFlush(display);
        }
    }
}

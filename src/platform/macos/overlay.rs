//! macOS overlay surfaces: borderless, transparent `NSWindow`s.
//!
//! Windows sit at the status level, join every Space and ignore the mouse.
//! Cocoa screen coordinates are the bottom-left virtual desktop, so a
//! surface's virtual-desktop bounds are its window frame as-is. Frames are
//! rasterized at the display's backing scale and set as the content view
//! layer's contents.
//!
//! AppKit is main-thread only; [`OverlayBackend::new`] refuses to run
//! anywhere else.

use crate::error::{Error, Result};
use crate::paint::Frame;
use crate::render::{Canvas, LabelFont};
use crate::surface::{OverlaySurface, SurfaceBackend, SurfaceConfig, SurfaceLevel};
use objc2::msg_send;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_app_kit::{
    NSApplication, NSApplicationActivationPolicy, NSBackingStoreType, NSColor, NSEventMask,
    NSWindow, NSWindowCollectionBehavior, NSWindowStyleMask,
};
use objc2_core_foundation::CFRetained;
use objc2_core_graphics::{
    CGBitmapContextCreate, CGBitmapContextCreateImage, CGBitmapContextGetData,
    CGColorSpaceCreateDeviceRGB, CGContext, CGImage, CGImageAlphaInfo,
};
use objc2_foundation::{MainThreadMarker, NSDefaultRunLoopMode, NSPoint, NSRect, NSSize};
use std::time::Duration;

/// Window levels (`NSNormalWindowLevel`, `NSStatusWindowLevel`,
/// `NSPopUpMenuWindowLevel`).
const NORMAL_LEVEL: isize = 0;
const STATUS_LEVEL: isize = 25;
const POP_UP_MENU_LEVEL: isize = 101;

/// Idle event pumping period.
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Creates one overlay window per display.
pub struct OverlayBackend {
    mtm: MainThreadMarker,
    app: Retained<NSApplication>,
    font: Option<LabelFont>,
}

impl OverlayBackend {
    /// Set up the shared application as a Dock-less accessory.
    pub fn new() -> Result<Self> {
        let mtm = MainThreadMarker::new().ok_or_else(|| {
            Error::NotSupported("overlay windows must be created on the main thread".into())
        })?;
        let app = NSApplication::sharedApplication(mtm);
        app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
        unsafe { app.finishLaunching() };
        Ok(Self {
            mtm,
            app,
            font: LabelFont::system(),
        })
    }
}

impl SurfaceBackend for OverlayBackend {
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn OverlaySurface>> {
        Ok(Box::new(OverlayWindow::create(
            self.mtm,
            config,
            self.font.clone(),
        )?))
    }

    fn pump(&mut self) {
        loop {
            let event = unsafe {
                self.app.nextEventMatchingMask_untilDate_inMode_dequeue(
                    NSEventMask::Any,
                    None,
                    NSDefaultRunLoopMode,
                    true,
                )
            };
            let Some(event) = event else {
                break;
            };
            self.app.sendEvent(&event);
        }
        self.app.updateWindows();
    }

    fn pump_interval(&self) -> Option<Duration> {
        Some(PUMP_INTERVAL)
    }
}

struct OverlayWindow {
    window: Retained<NSWindow>,
    canvas: Canvas,
    context: CFRetained<CGContext>,
}

impl OverlayWindow {
    fn create(
        mtm: MainThreadMarker,
        config: &SurfaceConfig,
        font: Option<LabelFont>,
    ) -> Result<Self> {
        let bounds = config.bounds;
        let scale = if config.scale_factor.is_finite() && config.scale_factor > 0.0 {
            config.scale_factor
        } else {
            1.0
        };
        let width = (bounds.width * scale).round().max(1.0) as usize;
        let height = (bounds.height * scale).round().max(1.0) as usize;
        let canvas = Canvas::with_scale(width, height, scale)
            .ok_or_else(|| Error::SurfaceCreation(format!("bad size {width}x{height}")))?
            .with_font(font);
        let context = bitmap_context(width, height)?;

        let frame = NSRect::new(
            NSPoint::new(bounds.x, bounds.y),
            NSSize::new(bounds.width, bounds.height),
        );
        let window = unsafe {
            NSWindow::initWithContentRect_styleMask_backing_defer(
                NSWindow::alloc(mtm),
                frame,
                NSWindowStyleMask::Borderless,
                NSBackingStoreType::Buffered,
                false,
            )
        };
        unsafe { window.setReleasedWhenClosed(false) };
        window.setOpaque(false);
        window.setBackgroundColor(Some(&NSColor::clearColor()));
        window.setHasShadow(false);
        window.setIgnoresMouseEvents(config.click_through);
        window.setLevel(match config.level {
            SurfaceLevel::Normal => NORMAL_LEVEL,
            SurfaceLevel::Overlay => STATUS_LEVEL,
            SurfaceLevel::System => POP_UP_MENU_LEVEL,
        });
        window.setCollectionBehavior(
            NSWindowCollectionBehavior::CanJoinAllSpaces
                | NSWindowCollectionBehavior::Stationary
                | NSWindowCollectionBehavior::IgnoresCycle
                | NSWindowCollectionBehavior::FullScreenAuxiliary,
        );
        window.setAlphaValue(0.0);

        let view = window
            .contentView()
            .ok_or_else(|| Error::SurfaceCreation("window has no content view".into()))?;
        view.setWantsLayer(true);

        log::debug!(
            "overlay window for display {} at {:?} ({}x{} px)",
            config.display_id,
            bounds,
            width,
            height
        );
        Ok(Self {
            window,
            canvas,
            context,
        })
    }

    fn set_contents(&self, image: &CGImage) -> Result<()> {
        let view = self
            .window
            .contentView()
            .ok_or_else(|| Error::Platform("content view went away".into()))?;
        let layer: Option<Retained<AnyObject>> = unsafe { msg_send![&*view, layer] };
        let layer = layer.ok_or_else(|| Error::Platform("content view has no layer".into()))?;
        let contents = image as *const CGImage as *mut AnyObject;
        unsafe {
            let _: () = msg_send![&*layer, setContents: contents];
        }
        Ok(())
    }
}

/// An RGBA premultiplied bitmap context matching the canvas layout.
fn bitmap_context(width: usize, height: usize) -> Result<CFRetained<CGContext>> {
    let space = unsafe { CGColorSpaceCreateDeviceRGB() }
        .ok_or_else(|| Error::SurfaceCreation("no device RGB color space".into()))?;
    unsafe {
        CGBitmapContextCreate(
            std::ptr::null_mut(),
            width,
            height,
            8,
            width * 4,
            Some(&space),
            CGImageAlphaInfo::PremultipliedLast.0,
        )
    }
    .ok_or_else(|| Error::SurfaceCreation("CGBitmapContextCreate failed".into()))
}

impl OverlaySurface for OverlayWindow {
    fn set_visible(&mut self, visible: bool) {
        if visible {
            self.window.orderFrontRegardless();
        } else {
            self.window.orderOut(None);
        }
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.window.setAlphaValue(opacity.clamp(0.0, 1.0));
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.canvas.clear();
        self.canvas.render(frame);

        let data = unsafe { CGBitmapContextGetData(Some(&self.context)) };
        if data.is_null() {
            return Err(Error::Platform("bitmap context has no backing store".into()));
        }
        let pixels = self.canvas.data();
        // SAFETY: the context was created for exactly the canvas dimensions
        // with 4 bytes per pixel and no row padding.
        unsafe {
            std::ptr::copy_nonoverlapping(pixels.as_ptr(), data.cast::<u8>(), pixels.len());
        }

        let image = unsafe { CGBitmapContextCreateImage(Some(&self.context)) }
            .ok_or_else(|| Error::Platform("CGBitmapContextCreateImage failed".into()))?;
        self.set_contents(&image)
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        self.window.orderOut(None);
        self.window.close();
    }
}

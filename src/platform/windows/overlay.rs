//! Windows overlay surfaces: layered, topmost, click-through popups.
//!
//! Each surface owns a top-down 32-bit DIB section selected into a memory
//! DC. A present rasterizes the frame, copies it into the DIB as
//! premultiplied BGRA and hands it to `UpdateLayeredWindow`; opacity is the
//! blend function's constant alpha, so fades do not re-rasterize.
//!
//! Monitor bounds are reported in physical pixels, so one frame point is one
//! pixel here.

use crate::error::{Error, Result};
use crate::paint::Frame;
use crate::render::{Canvas, LabelFont};
use crate::surface::{OverlaySurface, SurfaceBackend, SurfaceConfig, SurfaceLevel};
use std::ffi::c_void;
use std::time::Duration;
use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    AC_SRC_ALPHA, AC_SRC_OVER, BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BLENDFUNCTION,
    CreateCompatibleDC, CreateDIBSection, DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, HBITMAP,
    HDC, HGDIOBJ, ReleaseDC, SelectObject,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, MSG,
    PM_REMOVE, PeekMessageW, RegisterClassExW, SW_HIDE, SW_SHOWNOACTIVATE, ShowWindow,
    TranslateMessage, ULW_ALPHA, UpdateLayeredWindow, WNDCLASSEXW,
    WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT,
    WS_POPUP,
};
use windows::core::w;

/// Idle message pumping period.
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Creates one layered window per display.
pub struct OverlayBackend {
    instance: HINSTANCE,
    font: Option<LabelFont>,
}

impl OverlayBackend {
    /// Register the overlay window class.
    pub fn new() -> Result<Self> {
        let module = unsafe { GetModuleHandleW(None) }
            .map_err(|e| Error::Platform(format!("GetModuleHandleW failed: {e}")))?;
        let instance: HINSTANCE = module.into();

        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(overlay_wnd_proc),
            hInstance: instance,
            lpszClassName: w!("LimelightOverlay"),
            ..Default::default()
        };
        // Zero means failure, or that an earlier backend already registered it.
        if unsafe { RegisterClassExW(&class) } == 0 {
            log::debug!("overlay window class already registered");
        }

        Ok(Self {
            instance,
            font: LabelFont::system(),
        })
    }
}

impl SurfaceBackend for OverlayBackend {
    fn create_surface(&mut self, config: &SurfaceConfig) -> Result<Box<dyn OverlaySurface>> {
        Ok(Box::new(LayeredWindow::create(
            self.instance,
            config,
            self.font.clone(),
        )?))
    }

    fn pump(&mut self) {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    fn pump_interval(&self) -> Option<Duration> {
        Some(PUMP_INTERVAL)
    }
}

unsafe extern "system" fn overlay_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

struct LayeredWindow {
    hwnd: HWND,
    origin: POINT,
    size: SIZE,
    memory_dc: HDC,
    bitmap: HBITMAP,
    previous: HGDIOBJ,
    bits: *mut u8,
    canvas: Canvas,
    alpha: u8,
}

impl LayeredWindow {
    fn create(
        instance: HINSTANCE,
        config: &SurfaceConfig,
        font: Option<LabelFont>,
    ) -> Result<Self> {
        let bounds = config.native_bounds;
        let width = bounds.width.round().max(1.0) as i32;
        let height = bounds.height.round().max(1.0) as i32;
        let canvas = Canvas::new(width as usize, height as usize)
            .ok_or_else(|| Error::SurfaceCreation(format!("bad size {width}x{height}")))?
            .with_font(font);

        let mut ex_style = WS_EX_LAYERED | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE;
        if config.click_through {
            ex_style |= WS_EX_TRANSPARENT;
        }
        if config.level != SurfaceLevel::Normal {
            ex_style |= WS_EX_TOPMOST;
        }

        let hwnd = unsafe {
            CreateWindowExW(
                ex_style,
                w!("LimelightOverlay"),
                w!(""),
                WS_POPUP,
                bounds.x.round() as i32,
                bounds.y.round() as i32,
                width,
                height,
                None,
                None,
                Some(instance),
                None,
            )
        }
        .map_err(|e| Error::SurfaceCreation(format!("CreateWindowExW failed: {e}")))?;

        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height: rows top-down, matching the canvas.
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut bits: *mut c_void = std::ptr::null_mut();
        let (memory_dc, bitmap) = unsafe {
            let screen = GetDC(None);
            let memory_dc = CreateCompatibleDC(Some(screen));
            let bitmap = CreateDIBSection(Some(screen), &info, DIB_RGB_COLORS, &mut bits, None, 0);
            ReleaseDC(None, screen);
            match bitmap {
                Ok(bitmap) if !bits.is_null() => (memory_dc, bitmap),
                other => {
                    if let Ok(bitmap) = other {
                        let _ = DeleteObject(bitmap.into());
                    }
                    let _ = DeleteDC(memory_dc);
                    let _ = DestroyWindow(hwnd);
                    return Err(Error::SurfaceCreation("CreateDIBSection failed".into()));
                }
            }
        };
        let previous = unsafe { SelectObject(memory_dc, bitmap.into()) };

        log::debug!(
            "layered overlay for display {} at {:?}",
            config.display_id,
            bounds
        );
        Ok(Self {
            hwnd,
            origin: POINT {
                x: bounds.x.round() as i32,
                y: bounds.y.round() as i32,
            },
            size: SIZE {
                cx: width,
                cy: height,
            },
            memory_dc,
            bitmap,
            previous,
            bits: bits.cast(),
            canvas,
            alpha: 0,
        })
    }

    fn update(&self) -> Result<()> {
        let source = POINT { x: 0, y: 0 };
        let blend = BLENDFUNCTION {
            BlendOp: AC_SRC_OVER as u8,
            SourceConstantAlpha: self.alpha,
            AlphaFormat: AC_SRC_ALPHA as u8,
            ..Default::default()
        };
        unsafe {
            UpdateLayeredWindow(
                self.hwnd,
                None,
                Some(&self.origin),
                Some(&self.size),
                Some(self.memory_dc),
                Some(&source),
                COLORREF(0),
                Some(&blend),
                ULW_ALPHA,
            )
        }
        .map_err(|e| Error::Platform(format!("UpdateLayeredWindow failed: {e}")))
    }
}

impl OverlaySurface for LayeredWindow {
    fn set_visible(&mut self, visible: bool) {
        let command = if visible { SW_SHOWNOACTIVATE } else { SW_HIDE };
        unsafe {
            let _ = ShowWindow(self.hwnd, command);
        }
    }

    fn set_opacity(&mut self, opacity: f64) {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        if alpha == self.alpha {
            return;
        }
        self.alpha = alpha;
        if let Err(err) = self.update() {
            log::debug!("{err}");
        }
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.canvas.clear();
        self.canvas.render(frame);
        let len = self.size.cx as usize * self.size.cy as usize * 4;
        // SAFETY: the DIB section holds exactly `len` bytes and lives until Drop.
        let pixels = unsafe { std::slice::from_raw_parts_mut(self.bits, len) };
        self.canvas.write_bgra(pixels, 1.0);
        self.update()
    }
}

impl Drop for LayeredWindow {
    fn drop(&mut self) {
        unsafe {
            let _ = SelectObject(self.memory_dc, self.previous);
            let _ = DeleteObject(self.bitmap.into());
            let _ = DeleteDC(self.memory_dc);
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

//! Windows monitor enumeration and cursor queries.

use crate::display::DisplayInfo;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use std::mem::{MaybeUninit, size_of};
use windows::Win32::Foundation::{BOOL, LPARAM, POINT, RECT};
use windows::Win32::Graphics::Gdi::{
    DEVMODEW, ENUM_CURRENT_SETTINGS, EnumDisplayMonitors, EnumDisplaySettingsW, GetMonitorInfoW,
    HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
};
use windows::Win32::UI::HiDpi::{GetDpiForMonitor, GetDpiForSystem, MDT_EFFECTIVE_DPI};
use windows::Win32::UI::WindowsAndMessaging::{GetCursorPos, MONITORINFOF_PRIMARY};
use windows::core::PCWSTR;

/// All monitors in virtual-screen coordinates (top-left origin).
pub fn displays() -> Result<Vec<DisplayInfo>> {
    let mut context = MonitorContext {
        displays: Vec::new(),
        next_id: 1,
    };

    let ok = unsafe {
        EnumDisplayMonitors(
            Some(HDC(std::ptr::null_mut())),
            None,
            Some(monitor_enum_proc),
            LPARAM(&mut context as *mut _ as isize),
        )
    };

    if ok.as_bool() && !context.displays.is_empty() {
        Ok(context.displays)
    } else {
        Err(Error::Platform("EnumDisplayMonitors failed".into()))
    }
}

pub fn cursor_position() -> Result<Point> {
    let mut point = POINT::default();
    unsafe { GetCursorPos(&mut point) }
        .map_err(|e| Error::Platform(format!("GetCursorPos failed: {e}")))?;
    Ok(Point::new(point.x as f64, point.y as f64))
}

struct MonitorContext {
    displays: Vec<DisplayInfo>,
    next_id: u32,
}

unsafe extern "system" fn monitor_enum_proc(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _lprc: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let context = unsafe { &mut *(lparam.0 as *mut MonitorContext) };
    let info = monitor_info(hmonitor);
    let display = display_from_info(hmonitor, &info, context.next_id);
    context.next_id += 1;
    context.displays.push(display);
    BOOL(1)
}

fn monitor_info(hmonitor: HMONITOR) -> MONITORINFOEXW {
    let mut info = MONITORINFOEXW {
        monitorInfo: MONITORINFO {
            cbSize: size_of::<MONITORINFOEXW>() as u32,
            ..Default::default()
        },
        ..Default::default()
    };
    unsafe {
        let _ = GetMonitorInfoW(hmonitor, &mut info as *mut _ as *mut MONITORINFO);
    }
    info
}

fn display_from_info(hmonitor: HMONITOR, info: &MONITORINFOEXW, id: u32) -> DisplayInfo {
    let rect = info.monitorInfo.rcMonitor;

    DisplayInfo {
        id,
        bounds: Rect::new(
            rect.left as f64,
            rect.top as f64,
            (rect.right - rect.left) as f64,
            (rect.bottom - rect.top) as f64,
        ),
        scale_factor: monitor_dpi_scale(hmonitor).unwrap_or(1.0),
        refresh_rate: monitor_refresh_rate(info),
        is_primary: (info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY) != 0,
    }
}

fn monitor_dpi_scale(hmonitor: HMONITOR) -> Option<f64> {
    let mut dpi_x: u32 = 0;
    let mut dpi_y: u32 = 0;
    let result = unsafe { GetDpiForMonitor(hmonitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) };
    if result.is_ok() && dpi_x > 0 {
        return Some(dpi_x as f64 / 96.0);
    }
    let dpi = unsafe { GetDpiForSystem() };
    (dpi > 0).then(|| dpi as f64 / 96.0)
}

fn monitor_refresh_rate(info: &MONITORINFOEXW) -> Option<u32> {
    let mut devmode = unsafe { MaybeUninit::<DEVMODEW>::zeroed().assume_init() };
    devmode.dmSize = size_of::<DEVMODEW>() as u16;

    let device = PCWSTR(info.szDevice.as_ptr());
    let ok = unsafe { EnumDisplaySettingsW(device, ENUM_CURRENT_SETTINGS, &mut devmode) };
    (ok.as_bool() && devmode.dmDisplayFrequency > 1).then_some(devmode.dmDisplayFrequency)
}

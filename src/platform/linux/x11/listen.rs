//! X11 input listening using XRecord.
//!
//! XRecord is listen-only by nature, which is exactly what the overlay needs:
//! events are observed and always reach the focused application.

use crate::error::{Error, Result};
use crate::event::{Button, Event};
use crate::hook::EventHandler;
use crate::state::{self, MASK_BUTTON1, MASK_BUTTON2, MASK_BUTTON3};
use std::os::raw::{c_char, c_int, c_uchar, c_ulong};
use std::ptr::null;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use x11::xlib;
use x11::xrecord;

use crate::platform::linux::keycodes::keycode_to_key;

/// Stored handler for the callback
static HANDLER: Mutex<Option<Box<dyn EventHandler>>> = Mutex::new(None);

/// Flag to signal stopping
static STOP_FLAG: Mutex<Option<Arc<AtomicBool>>> = Mutex::new(None);

/// XRecord context for stopping the hook
static CONTEXT: Mutex<Option<xrecord::XRecordContext>> = Mutex::new(None);

const FALSE: c_int = 0;

/// XRecord data structure for events
#[repr(C)]
struct XRecordDatum {
    type_: u8,
    code: u8,
    _rest: u64,
    _1: bool,
    _2: bool,
    _3: bool,
    root_x: i16,
    root_y: i16,
    _event_x: i16,
    _event_y: i16,
    _state: u16,
}

fn update_key_modifier(code: u32, pressed: bool) {
    let mask = keycode_to_key(code).modifier_mask();
    if mask == 0 {
        return;
    }
    if pressed {
        state::set_mask(mask);
    } else {
        state::unset_mask(mask);
    }
}

fn button_from_code(code: u8) -> (Button, u32) {
    match code {
        1 => (Button::Left, MASK_BUTTON1),
        2 => (Button::Middle, MASK_BUTTON3),
        3 => (Button::Right, MASK_BUTTON2),
        c => (Button::Unknown(c), 0),
    }
}

/// Convert X11 event to our Event type
fn convert_event(type_: c_int, code: u8, x: f64, y: f64) -> Option<Event> {
    match type_ {
        t if t == xlib::KeyPress => {
            let code32 = code as u32;
            // Mask is captured before the modifier itself is applied, so a
            // bare Ctrl press does not look like "Ctrl held + Ctrl".
            let event = Event::key_pressed(keycode_to_key(code32), code32);
            update_key_modifier(code32, true);
            Some(event)
        }

        t if t == xlib::KeyRelease => {
            let code32 = code as u32;
            update_key_modifier(code32, false);
            Some(Event::key_released(keycode_to_key(code32), code32))
        }

        // Buttons 4..=7 are wheel ticks; the overlay has no use for them.
        t if t == xlib::ButtonPress => match code {
            4..=7 => None,
            c => {
                let (button, mask) = button_from_code(c);
                if mask != 0 {
                    state::set_mask(mask);
                }
                Some(Event::mouse_pressed(button, x, y))
            }
        },

        t if t == xlib::ButtonRelease => match code {
            4..=7 => None,
            c => {
                let (button, mask) = button_from_code(c);
                if mask != 0 {
                    state::unset_mask(mask);
                }
                Some(Event::mouse_released(button, x, y))
            }
        },

        t if t == xlib::MotionNotify => {
            if state::is_button_held() {
                Some(Event::mouse_dragged(x, y))
            } else {
                Some(Event::mouse_moved(x, y))
            }
        }

        _ => None,
    }
}

fn dispatch(event: &Event) {
    if let Ok(guard) = HANDLER.lock()
        && let Some(ref handler) = *guard
    {
        handler.handle_event(event);
    }
}

/// XRecord callback
unsafe extern "C" fn record_callback(
    _null: *mut c_char,
    raw_data: *mut xrecord::XRecordInterceptData,
) {
    unsafe {
        let data = match raw_data.as_ref() {
            Some(d) => d,
            None => return,
        };

        if data.category != xrecord::XRecordFromServer {
            xrecord::XRecordFreeData(raw_data);
            return;
        }

        if let Ok(guard) = STOP_FLAG.lock()
            && let Some(ref flag) = *guard
            && !flag.load(Ordering::SeqCst)
        {
            xrecord::XRecordFreeData(raw_data);
            return;
        }

        #[allow(clippy::cast_ptr_alignment)]
        let xdatum = match (data.data as *const XRecordDatum).as_ref() {
            Some(d) => d,
            None => {
                xrecord::XRecordFreeData(raw_data);
                return;
            }
        };

        let type_ = xdatum.type_ as c_int;
        let x = xdatum.root_x as f64;
        let y = xdatum.root_y as f64;

        if let Some(event) = convert_event(type_, xdatum.code, x, y) {
            dispatch(&event);
        }

        xrecord::XRecordFreeData(raw_data);
    }
}

fn clear_statics() -> Result<()> {
    *HANDLER
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    *STOP_FLAG
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    *CONTEXT
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    Ok(())
}

/// Run the event hook (blocking).
pub fn run_hook<H: EventHandler + 'static>(running: &Arc<AtomicBool>, handler: H) -> Result<()> {
    *HANDLER
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = Some(Box::new(handler));
    *STOP_FLAG
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = Some(running.clone());

    let result = unsafe { record_loop() };
    clear_statics()?;
    result
}

unsafe fn record_loop() -> Result<()> {
    unsafe {
        let dpy_control = xlib::XOpenDisplay(null());
        if dpy_control.is_null() {
            return Err(Error::HookStartFailed("Failed to open X display".into()));
        }

        let extension_name = c"RECORD";
        let extension = xlib::XInitExtension(dpy_control, extension_name.as_ptr());
        if extension.is_null() {
            xlib::XCloseDisplay(dpy_control);
            return Err(Error::PermissionDenied(
                "XRecord extension not available".into(),
            ));
        }

        let mut record_range: xrecord::XRecordRange = *xrecord::XRecordAllocRange();
        record_range.device_events.first = xlib::KeyPress as c_uchar;
        record_range.device_events.last = xlib::MotionNotify as c_uchar;

        let mut record_all_clients: c_ulong = xrecord::XRecordAllClients;
        let context = xrecord::XRecordCreateContext(
            dpy_control,
            0,
            &mut record_all_clients,
            1,
            &mut &mut record_range as *mut &mut xrecord::XRecordRange
                as *mut *mut xrecord::XRecordRange,
            1,
        );

        if context == 0 {
            xlib::XCloseDisplay(dpy_control);
            return Err(Error::HookStartFailed(
                "Failed to create XRecord context".into(),
            ));
        }

        xlib::XSync(dpy_control, FALSE);

        *CONTEXT
            .lock()
            .map_err(|_| Error::ThreadError("context mutex poisoned".into()))? = Some(context);

        dispatch(&Event::hook_enabled());

        let result =
            xrecord::XRecordEnableContext(dpy_control, context, Some(record_callback), &mut 0);

        dispatch(&Event::hook_disabled());

        xrecord::XRecordDisableContext(dpy_control, context);
        xrecord::XRecordFreeContext(dpy_control, context);
        xlib::XCloseDisplay(dpy_control);

        if result == 0 {
            return Err(Error::HookStartFailed(
                "Failed to enable XRecord context".into(),
            ));
        }
    }

    Ok(())
}

/// Stop the event hook.
pub fn stop_hook() -> Result<()> {
    if let Ok(guard) = STOP_FLAG.lock()
        && let Some(ref flag) = *guard
    {
        flag.store(false, Ordering::SeqCst);
    }

    // XRecordDisableContext has to go through a separate control connection
    // to unblock XRecordEnableContext on the data connection.
    unsafe {
        if let Ok(ctx_guard) = CONTEXT.lock()
            && let Some(ctx) = *ctx_guard
        {
            let dpy_control = xlib::XOpenDisplay(null());
            if !dpy_control.is_null() {
                xrecord::XRecordDisableContext(dpy_control, ctx);
                xlib::XCloseDisplay(dpy_control);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_buttons_are_dropped() {
        assert!(convert_event(xlib::ButtonPress, 4, 0.0, 0.0).is_none());
        assert!(convert_event(xlib::ButtonRelease, 7, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_x11_button_numbering() {
        assert_eq!(button_from_code(2).0, Button::Middle);
        assert_eq!(button_from_code(3).0, Button::Right);
    }
}

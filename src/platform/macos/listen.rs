//! macOS input listening using a listen-only CGEventTap.

#![allow(improper_ctypes_definitions)]
#![allow(unsafe_op_in_unsafe_fn)]

use crate::error::{Error, Result};
use crate::event::{Button, Event};
use crate::hook::EventHandler;
use crate::state::{
    self, MASK_ALT, MASK_BUTTON1, MASK_BUTTON2, MASK_BUTTON3, MASK_BUTTON4, MASK_BUTTON5,
    MASK_CTRL, MASK_META, MASK_SHIFT,
};
use core::ptr::NonNull;
use objc2_core_foundation::{CFMachPort, CFRetained, CFRunLoop, kCFRunLoopCommonModes};
use objc2_core_graphics::{
    CGEvent, CGEventField, CGEventFlags, CGEventTapCallBack, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventTapProxy, CGEventType, kCGEventMaskForAllEvents,
};
use objc2_foundation::NSAutoreleasePool;
use std::ffi::c_void;
use std::ptr::null_mut;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::keycodes::keycode_to_key;

/// Stored handler for the callback
static HANDLER: Mutex<Option<Box<dyn EventHandler>>> = Mutex::new(None);

/// Flag to signal the run loop to stop
static STOP_FLAG: Mutex<Option<Arc<AtomicBool>>> = Mutex::new(None);

/// Wrapper for raw pointer to CFMachPort that implements Send + Sync
/// Safety: The pointer is only accessed from the callback which runs on the same thread
struct TapPointer(*const CFMachPort);
unsafe impl Send for TapPointer {}
unsafe impl Sync for TapPointer {}

/// Stored event tap for timeout recovery
static EVENT_TAP: Mutex<Option<TapPointer>> = Mutex::new(None);

/// The hook thread's run loop. CFRunLoopStop may be called from any thread.
struct RunLoopRef(CFRetained<CFRunLoop>);
unsafe impl Send for RunLoopRef {}

static RUN_LOOP: Mutex<Option<RunLoopRef>> = Mutex::new(None);

#[link(name = "Cocoa", kind = "framework")]
unsafe extern "C" {}

/// Convert CGEventFlags to our modifier mask
fn flags_to_mask(flags: CGEventFlags) -> u32 {
    let mut mask = 0u32;

    if flags.contains(CGEventFlags::MaskShift) {
        mask |= MASK_SHIFT;
    }
    if flags.contains(CGEventFlags::MaskControl) {
        mask |= MASK_CTRL;
    }
    if flags.contains(CGEventFlags::MaskAlternate) {
        mask |= MASK_ALT;
    }
    if flags.contains(CGEventFlags::MaskCommand) {
        mask |= MASK_META;
    }

    mask
}

fn other_button(button: i64) -> (Button, u32) {
    match button {
        2 => (Button::Middle, MASK_BUTTON3),
        3 => (Button::Button4, MASK_BUTTON4),
        4 => (Button::Button5, MASK_BUTTON5),
        n => (Button::Unknown(n as u8), 0),
    }
}

fn dispatch(event: &Event) {
    if let Ok(guard) = HANDLER.lock()
        && let Some(ref handler) = *guard
    {
        handler.handle_event(event);
    }
}

/// The CGEventTap callback
unsafe extern "C-unwind" fn event_callback(
    _proxy: CGEventTapProxy,
    event_type: CGEventType,
    cg_event: NonNull<CGEvent>,
    _user_info: *mut c_void,
) -> *mut CGEvent {
    if let Ok(guard) = STOP_FLAG.lock()
        && let Some(ref flag) = *guard
        && !flag.load(Ordering::SeqCst)
    {
        if let Some(run_loop) = CFRunLoop::current() {
            run_loop.stop();
        }
        return cg_event.as_ptr();
    }

    // macOS disables a tap whose callback is too slow, or during input
    // storms. The notice arrives through the tap itself; switch it straight
    // back on so the session keeps receiving events.
    if event_type == CGEventType::TapDisabledByTimeout
        || event_type == CGEventType::TapDisabledByUserInput
    {
        if let Ok(guard) = EVENT_TAP.lock()
            && let Some(ref tap_ptr) = *guard
            && !tap_ptr.0.is_null()
        {
            log::warn!("event tap was disabled by the system ({event_type:?}), re-enabling");
            CGEvent::tap_enable(&*tap_ptr.0, true);
            dispatch(&Event::hook_reenabled());
        }
        return cg_event.as_ptr();
    }

    let flags = CGEvent::flags(Some(cg_event.as_ref()));
    state::replace_modifiers(flags_to_mask(flags));

    if let Some(event) = convert_event(event_type, cg_event) {
        dispatch(&event);
    }

    cg_event.as_ptr()
}

unsafe fn location(cg_event: NonNull<CGEvent>) -> (f64, f64) {
    let point = CGEvent::location(Some(cg_event.as_ref()));
    (point.x, point.y)
}

/// Convert a CGEvent to our Event type
unsafe fn convert_event(event_type: CGEventType, cg_event: NonNull<CGEvent>) -> Option<Event> {
    match event_type {
        CGEventType::KeyDown | CGEventType::KeyUp => {
            let code = CGEvent::integer_value_field(
                Some(cg_event.as_ref()),
                CGEventField::KeyboardEventKeycode,
            );
            let key = keycode_to_key(code as u16);
            if event_type == CGEventType::KeyDown {
                Some(Event::key_pressed(key, code as u32))
            } else {
                Some(Event::key_released(key, code as u32))
            }
        }

        // Modifier keys only ever arrive as flag changes; whether the key
        // went down is read off the new flag set.
        CGEventType::FlagsChanged => {
            let code = CGEvent::integer_value_field(
                Some(cg_event.as_ref()),
                CGEventField::KeyboardEventKeycode,
            );
            let key = keycode_to_key(code as u16);
            let bit = key.modifier_mask();
            if bit == 0 {
                return None;
            }
            let flags = CGEvent::flags(Some(cg_event.as_ref()));
            if flags_to_mask(flags) & bit != 0 {
                Some(Event::key_pressed(key, code as u32))
            } else {
                Some(Event::key_released(key, code as u32))
            }
        }

        CGEventType::LeftMouseDown => {
            state::set_mask(MASK_BUTTON1);
            let (x, y) = location(cg_event);
            Some(Event::mouse_pressed(Button::Left, x, y))
        }

        CGEventType::LeftMouseUp => {
            state::unset_mask(MASK_BUTTON1);
            let (x, y) = location(cg_event);
            Some(Event::mouse_released(Button::Left, x, y))
        }

        CGEventType::RightMouseDown => {
            state::set_mask(MASK_BUTTON2);
            let (x, y) = location(cg_event);
            Some(Event::mouse_pressed(Button::Right, x, y))
        }

        CGEventType::RightMouseUp => {
            state::unset_mask(MASK_BUTTON2);
            let (x, y) = location(cg_event);
            Some(Event::mouse_released(Button::Right, x, y))
        }

        CGEventType::OtherMouseDown | CGEventType::OtherMouseUp => {
            let button_num = CGEvent::integer_value_field(
                Some(cg_event.as_ref()),
                CGEventField::MouseEventButtonNumber,
            );
            let (button, mask) = other_button(button_num);
            let (x, y) = location(cg_event);
            if event_type == CGEventType::OtherMouseDown {
                state::set_mask(mask);
                Some(Event::mouse_pressed(button, x, y))
            } else {
                state::unset_mask(mask);
                Some(Event::mouse_released(button, x, y))
            }
        }

        CGEventType::MouseMoved => {
            let (x, y) = location(cg_event);
            if state::is_button_held() {
                Some(Event::mouse_dragged(x, y))
            } else {
                Some(Event::mouse_moved(x, y))
            }
        }

        CGEventType::LeftMouseDragged
        | CGEventType::RightMouseDragged
        | CGEventType::OtherMouseDragged => {
            let (x, y) = location(cg_event);
            Some(Event::mouse_dragged(x, y))
        }

        _ => None,
    }
}

fn clear_statics() -> Result<()> {
    *HANDLER
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    *STOP_FLAG
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    *EVENT_TAP
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    *RUN_LOOP
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

    let result = unsafe { tap_loop() };
    clear_statics()?;
    result
}

unsafe fn tap_loop() -> Result<()> {
    let _pool = NSAutoreleasePool::new();

    let callback: CGEventTapCallBack = Some(event_callback);
    let tap = CGEvent::tap_create(
        CGEventTapLocation::HIDEventTap,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        kCGEventMaskForAllEvents.into(),
        callback,
        null_mut(),
    )
    .ok_or_else(|| {
        Error::PermissionDenied(
            "Failed to create event tap. Make sure Input Monitoring / Accessibility permissions are granted."
                .into(),
        )
    })?;

    *EVENT_TAP
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? =
        Some(TapPointer(&*tap as *const CFMachPort));

    let source = CFMachPort::new_run_loop_source(None, Some(&tap), 0)
        .ok_or_else(|| Error::HookStartFailed("Failed to create run loop source".into()))?;

    let current_loop = CFRunLoop::current()
        .ok_or_else(|| Error::HookStartFailed("Failed to get current run loop".into()))?;

    current_loop.add_source(Some(&source), kCFRunLoopCommonModes);
    *RUN_LOOP
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? =
        Some(RunLoopRef(current_loop.clone()));

    CGEvent::tap_enable(&tap, true);

    dispatch(&Event::hook_enabled());

    CFRunLoop::run();

    dispatch(&Event::hook_disabled());

    Ok(())
}

/// Stop the event hook.
pub fn stop_hook() -> Result<()> {
    if let Ok(guard) = RUN_LOOP.lock()
        && let Some(ref run_loop) = *guard
    {
        run_loop.0.stop();
    }
    Ok(())
}

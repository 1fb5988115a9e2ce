//! Windows input listening using SetWindowsHookEx.

use crate::error::{Error, Result};
use crate::event::{Button, Event};
use crate::hook::EventHandler;
use crate::state::{self, MASK_BUTTON1, MASK_BUTTON2, MASK_BUTTON3, MASK_BUTTON4, MASK_BUTTON5};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT,
    PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx, WH_KEYBOARD_LL, WH_MOUSE_LL,
    WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP,
    WM_MOUSEMOVE, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
    WM_XBUTTONDOWN, WM_XBUTTONUP,
};

use super::keycodes::keycode_to_key;

// Wrapper for HHOOK to make it Send + Sync
#[derive(Clone, Copy)]
struct SendableHHOOK(HHOOK);

// SAFETY: HHOOK is an opaque handle owned by the system; it is only passed
// back to CallNextHookEx / UnhookWindowsHookEx.
unsafe impl Send for SendableHHOOK {}
unsafe impl Sync for SendableHHOOK {}

/// Stored handler for the callbacks
static HANDLER: Mutex<Option<Box<dyn EventHandler>>> = Mutex::new(None);

/// Flag to signal stopping
static STOP_FLAG: Mutex<Option<Arc<AtomicBool>>> = Mutex::new(None);

/// Hook handles
static KEYBOARD_HOOK: Mutex<Option<SendableHHOOK>> = Mutex::new(None);
static MOUSE_HOOK: Mutex<Option<SendableHHOOK>> = Mutex::new(None);

/// Thread ID for message posting
static THREAD_ID: Mutex<u32> = Mutex::new(0);

/// Update modifier mask from keyboard event
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

/// Get VK code from KBDLLHOOKSTRUCT
unsafe fn get_vk_code(lpdata: LPARAM) -> u32 {
    let kb = unsafe { *(lpdata.0 as *const KBDLLHOOKSTRUCT) };
    kb.vkCode
}

/// Get point from MSLLHOOKSTRUCT
unsafe fn get_mouse_point(lpdata: LPARAM) -> (f64, f64) {
    let mouse = unsafe { *(lpdata.0 as *const MSLLHOOKSTRUCT) };
    (mouse.pt.x as f64, mouse.pt.y as f64)
}

/// Get X button code from MSLLHOOKSTRUCT
unsafe fn get_xbutton(lpdata: LPARAM) -> (Button, u32) {
    let mouse = unsafe { *(lpdata.0 as *const MSLLHOOKSTRUCT) };
    match ((mouse.mouseData >> 16) & 0xFFFF) as u8 {
        1 => (Button::Button4, MASK_BUTTON4),
        2 => (Button::Button5, MASK_BUTTON5),
        n => (Button::Unknown(n), 0),
    }
}

fn mouse_button(msg: u32) -> Option<(Button, u32, bool)> {
    match msg {
        WM_LBUTTONDOWN => Some((Button::Left, MASK_BUTTON1, true)),
        WM_LBUTTONUP => Some((Button::Left, MASK_BUTTON1, false)),
        WM_RBUTTONDOWN => Some((Button::Right, MASK_BUTTON2, true)),
        WM_RBUTTONUP => Some((Button::Right, MASK_BUTTON2, false)),
        WM_MBUTTONDOWN => Some((Button::Middle, MASK_BUTTON3, true)),
        WM_MBUTTONUP => Some((Button::Middle, MASK_BUTTON3, false)),
        _ => None,
    }
}

/// Convert Windows message to our Event type
unsafe fn convert_event(wparam: WPARAM, lparam: LPARAM) -> Option<Event> {
    let msg = wparam.0 as u32;

    match msg {
        WM_KEYDOWN | WM_SYSKEYDOWN => {
            let code = unsafe { get_vk_code(lparam) };
            update_key_modifier(code, true);
            Some(Event::key_pressed(keycode_to_key(code), code))
        }

        WM_KEYUP | WM_SYSKEYUP => {
            let code = unsafe { get_vk_code(lparam) };
            update_key_modifier(code, false);
            Some(Event::key_released(keycode_to_key(code), code))
        }

        WM_XBUTTONDOWN | WM_XBUTTONUP => {
            let (button, mask) = unsafe { get_xbutton(lparam) };
            let (x, y) = unsafe { get_mouse_point(lparam) };
            if msg == WM_XBUTTONDOWN {
                state::set_mask(mask);
                Some(Event::mouse_pressed(button, x, y))
            } else {
                state::unset_mask(mask);
                Some(Event::mouse_released(button, x, y))
            }
        }

        WM_MOUSEMOVE => {
            let (x, y) = unsafe { get_mouse_point(lparam) };
            if state::is_button_held() {
                Some(Event::mouse_dragged(x, y))
            } else {
                Some(Event::mouse_moved(x, y))
            }
        }

        _ => {
            let (button, mask, pressed) = mouse_button(msg)?;
            let (x, y) = unsafe { get_mouse_point(lparam) };
            if pressed {
                state::set_mask(mask);
                Some(Event::mouse_pressed(button, x, y))
            } else {
                state::unset_mask(mask);
                Some(Event::mouse_released(button, x, y))
            }
        }
    }
}

fn dispatch(event: &Event) {
    if let Ok(guard) = HANDLER.lock()
        && let Some(ref handler) = *guard
    {
        handler.handle_event(event);
    }
}

fn stop_requested() -> bool {
    if let Ok(guard) = STOP_FLAG.lock()
        && let Some(ref flag) = *guard
    {
        return !flag.load(Ordering::SeqCst);
    }
    false
}

/// Shared body of both low-level callbacks. Events are never swallowed.
unsafe fn handle_callback(
    hook: &Mutex<Option<SendableHHOOK>>,
    code: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if code == HC_ACTION as i32 {
        if stop_requested() {
            let _ = stop_hook();
        } else if let Some(event) = unsafe { convert_event(wparam, lparam) } {
            dispatch(&event);
        }
    }

    let hook = hook.lock().ok().and_then(|g| g.map(|h| h.0));
    unsafe { CallNextHookEx(hook, code, wparam, lparam) }
}

unsafe extern "system" fn keyboard_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe { handle_callback(&KEYBOARD_HOOK, code, wparam, lparam) }
}

unsafe extern "system" fn mouse_callback(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe { handle_callback(&MOUSE_HOOK, code, wparam, lparam) }
}

fn unhook_all() {
    for slot in [&KEYBOARD_HOOK, &MOUSE_HOOK] {
        if let Ok(mut guard) = slot.lock()
            && let Some(hook) = guard.take()
        {
            unsafe {
                let _ = UnhookWindowsHookEx(hook.0);
            }
        }
    }
}

fn clear_statics() -> Result<()> {
    *HANDLER
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    *STOP_FLAG
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = None;
    *THREAD_ID
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = 0;
    Ok(())
}

/// Run the event hook (blocking).
///
/// Windows silently removes a low-level hook whose callback stalls past the
/// system timeout, without any notification. Keeping the callback to a
/// channel send is the only defence.
pub fn run_hook<H: EventHandler + 'static>(running: &Arc<AtomicBool>, handler: H) -> Result<()> {
    *HANDLER
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = Some(Box::new(handler));
    *STOP_FLAG
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = Some(running.clone());
    *THREAD_ID
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? =
        unsafe { GetCurrentThreadId() };

    let result = install_and_pump();
    unhook_all();
    clear_statics()?;
    result
}

fn install_and_pump() -> Result<()> {
    let keyboard_hook = unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_callback), None, 0)
            .map_err(|e| Error::HookStartFailed(format!("Failed to set keyboard hook: {}", e)))?
    };
    *KEYBOARD_HOOK
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? =
        Some(SendableHHOOK(keyboard_hook));

    let mouse_hook = unsafe {
        SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_callback), None, 0)
            .map_err(|e| Error::HookStartFailed(format!("Failed to set mouse hook: {}", e)))?
    };
    *MOUSE_HOOK
        .lock()
        .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = Some(SendableHHOOK(mouse_hook));

    dispatch(&Event::hook_enabled());

    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            if stop_requested() {
                break;
            }
        }
    }

    dispatch(&Event::hook_disabled());
    Ok(())
}

/// Stop the event hook.
pub fn stop_hook() -> Result<()> {
    if let Ok(thread_id) = THREAD_ID.lock()
        && *thread_id != 0
    {
        unsafe {
            let _ = PostThreadMessageW(*thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    }
    Ok(())
}

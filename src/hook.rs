//! Listen-only platform hook running on a background thread.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::platform;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Trait for handling raw input events.
///
/// Handlers run on whatever thread the OS delivers events on and must return
/// quickly: a slow handler is exactly what makes the OS disable a hook.
pub trait EventHandler: Send + Sync {
    /// Called when an input event occurs.
    fn handle_event(&self, event: &Event);
}

impl<F> EventHandler for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn handle_event(&self, event: &Event) {
        self(event);
    }
}

/// Called once with the error if the platform loop fails or refuses to start.
pub type FailureHandler = Box<dyn FnOnce(Error) + Send>;

/// Passive input hook that observes keyboard and mouse events system-wide.
///
/// Events always pass through to the focused application.
pub struct Hook {
    running: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Hook {
    fn default() -> Self {
        Self::new()
    }
}

impl Hook {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    /// Start listening on a background thread and return immediately.
    ///
    /// Start-up failures (for instance missing accessibility permission) are
    /// only known once the platform loop has tried to install itself, so they
    /// are reported through `on_failure` from the hook thread.
    pub fn run_async<H: EventHandler + 'static>(
        &self,
        handler: H,
        on_failure: FailureHandler,
    ) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }

        crate::state::reset_mask();

        let running = self.running.clone();
        let handle = std::thread::Builder::new()
            .name("limelight-hook".into())
            .spawn(move || {
                let result = platform::run_hook(&running, handler);
                running.store(false, Ordering::SeqCst);
                if let Err(err) = result {
                    on_failure(err);
                }
            })
            .map_err(|e| Error::ThreadError(format!("failed to spawn hook thread: {e}")))?;

        *self
            .thread_handle
            .lock()
            .map_err(|_| Error::ThreadError("hook handle mutex poisoned".into()))? = Some(handle);
        Ok(())
    }

    /// Stop the hook and join its thread. Idempotent.
    pub fn stop(&self) -> Result<()> {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if was_running {
            platform::stop_hook()?;
        }

        let handle = self
            .thread_handle
            .lock()
            .map_err(|_| Error::ThreadError("hook handle mutex poisoned".into()))?
            .take();
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join hook thread".into()))?;
        }

        Ok(())
    }

    /// Check if the hook loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Hook {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

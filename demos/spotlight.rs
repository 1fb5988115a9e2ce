//! Run the full engine against the real input hook and native overlay windows.
//!
//! Press Ctrl+Shift+Space (the default hotkey) to toggle the spotlight,
//! Escape to dismiss it, click to spawn ripples, type to see keystroke labels.
//!
//! Run with: cargo run --example spotlight
//!
//! Pass `--headless` to skip native windows and print the surface state once
//! a second instead. That mode also kicks in when the platform refuses to
//! create overlays (no compositor on X11, not on the main thread on macOS).
//!
//! Note: On macOS, you need to grant Accessibility permissions to the terminal.
//! Press Ctrl+C to exit.

use limelight::{
    AlwaysAuthorized, EngineHandle, EventLoop, GlobalInputMonitor, HeadlessBackend,
    MonotonicClock, OverlayEngine, SharedSettings, SurfaceBackend, SystemDisplays,
    native_backend, ui_channel,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

fn main() -> limelight::Result<()> {
    let headless = std::env::args().any(|arg| arg == "--headless");

    let clock = Arc::new(MonotonicClock::new());
    let settings = SharedSettings::default();
    settings.update(|s| {
        s.keystrokes = true;
        s.auto_deactivate = true;
        s.auto_deactivate_secs = 30.0;
    });

    let running = Arc::new(AtomicBool::new(true));
    let (backend, reporter): (Box<dyn SurfaceBackend>, Option<JoinHandle<()>>) = if headless {
        let backend = HeadlessBackend::new();
        let reporter = spawn_reporter(backend.clone(), running.clone());
        (Box::new(backend), Some(reporter))
    } else {
        match native_backend() {
            Ok(backend) => (backend, None),
            Err(err) => {
                eprintln!("Native overlays unavailable ({err}); falling back to --headless.");
                let backend = HeadlessBackend::new();
                let reporter = spawn_reporter(backend.clone(), running.clone());
                (Box::new(backend), Some(reporter))
            }
        }
    };

    let (tx, rx) = ui_channel();
    let handle = EngineHandle::new(tx.clone());

    let engine = OverlayEngine::new(
        clock.clone(),
        Box::new(settings),
        Box::new(SystemDisplays),
        Box::new(SystemDisplays),
        backend,
    );
    let monitor = GlobalInputMonitor::new(
        tx,
        clock,
        engine.primary_reference(),
        Arc::new(AlwaysAuthorized),
    );

    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        let _ = handle.shutdown();
        println!("\nStopping...");
    })
    .expect("Error setting Ctrl-C handler");

    println!("Press Ctrl+Shift+Space to toggle the spotlight, Ctrl+C to exit.");
    EventLoop::new(engine, rx).with_monitor(monitor).run()?;

    if let Some(reporter) = reporter {
        let _ = reporter.join();
    }
    Ok(())
}

fn spawn_reporter(backend: HeadlessBackend, running: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_secs(1));
            for record in backend.live() {
                println!(
                    "display {} visible={} opacity={:.2} presents={} ops={}",
                    record.config.display_id,
                    record.visible,
                    record.opacity,
                    record.presents,
                    record.last_frame.as_ref().map_or(0, |f| f.len())
                );
            }
        }
    })
}

//! Error types for the overlay engine.

use thiserror::Error;

/// Result type alias for limelight operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing input or driving overlays.
///
/// Most of these are absorbed locally: a failed hook puts the input monitor
/// into degraded mode, a failed surface leaves its display uncovered. None of
/// them should terminate the host process.
#[derive(Debug, Error)]
pub enum Error {
    /// Hook is already running.
    #[error("hook is already running")]
    AlreadyRunning,

    /// Failed to start the hook.
    #[error("failed to start hook: {0}")]
    HookStartFailed(String),

    /// Input monitoring was not authorized by the user or the OS.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Platform-specific error.
    #[error("platform error: {0}")]
    Platform(String),

    /// Thread-related error (join failure, poisoned lock).
    #[error("thread error: {0}")]
    ThreadError(String),

    /// The requested feature is not supported on this platform.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A surface backend could not create an overlay surface.
    #[error("failed to create overlay surface: {0}")]
    SurfaceCreation(String),

    /// The UI-thread channel has no receiver any more.
    #[error("ui channel disconnected")]
    Disconnected,

    /// A label font could not be read or parsed.
    #[error("failed to load font: {0}")]
    Font(String),

    /// Settings could not be parsed.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

//! Overlay settings and the read-only source the engine pulls them from.
//!
//! Persisting and editing settings is the host's business. The engine only
//! asks a [`SettingsSource`] for a fresh [`Settings`] snapshot whenever it
//! activates or paints, and clamps every value at the point of use, so a
//! host may hand over anything it likes.

use crate::paint::Color;
use crate::state::Modifiers;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const MIN_RADIUS: f64 = 10.0;
pub const MAX_RADIUS: f64 = 500.0;
pub const MIN_DIM_OPACITY: f64 = 0.1;
pub const MAX_DIM_OPACITY: f64 = 1.0;
pub const MIN_AUTO_DEACTIVATE_SECS: f64 = 1.0;
pub const MAX_AUTO_DEACTIVATE_SECS: f64 = 300.0;

/// Physical keycode of the space bar on this platform.
#[cfg(target_os = "macos")]
pub const SPACE_KEYCODE: u32 = 49;
#[cfg(target_os = "windows")]
pub const SPACE_KEYCODE: u32 = 0x20;
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const SPACE_KEYCODE: u32 = 65;

/// Shape of the spotlight cut-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpotlightShape {
    #[default]
    Circle,
    Square,
    Triangle,
    Star,
    Trapezoid,
    Cloud,
}

/// How the spotlight enters and leaves the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActivationStyle {
    /// Cut-out grows from 0.3x to full size while the overlay fades in,
    /// and shrinks back while it fades out.
    #[default]
    Zoom,
    /// Overlay opacity fade only.
    Fade,
}

/// A system-wide hotkey: a modifier set plus a physical keycode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HotkeyBinding {
    pub modifiers: Modifiers,
    /// Raw platform keycode, as carried in [`KeyboardData::raw_code`](crate::event::KeyboardData).
    pub key_code: u32,
}

impl HotkeyBinding {
    pub const fn new(modifiers: Modifiers, key_code: u32) -> Self {
        Self {
            modifiers,
            key_code,
        }
    }
}

impl Default for HotkeyBinding {
    /// Ctrl+Shift+Space.
    fn default() -> Self {
        Self::new(Modifiers::CTRL.union(Modifiers::SHIFT), SPACE_KEYCODE)
    }
}

/// Everything the overlay reads from its host.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// Cut-out radius in points.
    pub radius: f64,
    pub shape: SpotlightShape,
    pub dim_color: Color,
    /// Opacity of the dimmed area.
    pub dim_opacity: f64,
    /// Fraction of the radius given over to the soft edge, `0` is a hard edge.
    pub edge_blur: f64,
    pub activation_style: ActivationStyle,
    pub activation_secs: f64,
    pub auto_deactivate: bool,
    pub auto_deactivate_secs: f64,
    pub click_effects: bool,
    pub primary_click_color: Color,
    pub secondary_click_color: Color,
    pub ripple_secs: f64,
    pub keystrokes: bool,
    pub keystroke_secs: f64,
    pub hotkey: HotkeyBinding,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            radius: 120.0,
            shape: SpotlightShape::Circle,
            dim_color: Color::BLACK,
            dim_opacity: 0.6,
            edge_blur: 0.25,
            activation_style: ActivationStyle::Zoom,
            activation_secs: 0.25,
            auto_deactivate: false,
            auto_deactivate_secs: 10.0,
            click_effects: true,
            primary_click_color: Color::rgba(1.0, 0.8, 0.0, 0.9),
            secondary_click_color: Color::rgba(0.2, 0.6, 1.0, 0.9),
            ripple_secs: 0.4,
            keystrokes: false,
            keystroke_secs: 1.5,
            hotkey: HotkeyBinding::default(),
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

fn seconds_or(value: f64, fallback: f64) -> Duration {
    let secs = if value.is_finite() { value.max(0.0) } else { fallback };
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

impl Settings {
    /// Radius clamped to `[10, 500]`.
    pub fn clamped_radius(&self) -> f64 {
        clamp_or(self.radius, MIN_RADIUS, MAX_RADIUS, Settings::default().radius)
    }

    /// Dim opacity clamped to `[0.1, 1.0]`.
    pub fn clamped_dim_opacity(&self) -> f64 {
        clamp_or(
            self.dim_opacity,
            MIN_DIM_OPACITY,
            MAX_DIM_OPACITY,
            Settings::default().dim_opacity,
        )
    }

    /// Edge blur clamped to `[0, 1]`.
    pub fn clamped_edge_blur(&self) -> f64 {
        clamp_or(self.edge_blur, 0.0, 1.0, 0.0)
    }

    /// Auto-deactivate delay, clamped to `[1, 300]` seconds; `None` when disabled.
    pub fn auto_deactivate_after(&self) -> Option<Duration> {
        if !self.auto_deactivate {
            return None;
        }
        let secs = clamp_or(
            self.auto_deactivate_secs,
            MIN_AUTO_DEACTIVATE_SECS,
            MAX_AUTO_DEACTIVATE_SECS,
            Settings::default().auto_deactivate_secs,
        );
        Some(seconds_or(secs, MIN_AUTO_DEACTIVATE_SECS))
    }

    pub fn activation_duration(&self) -> Duration {
        seconds_or(self.activation_secs, Settings::default().activation_secs)
    }

    pub fn ripple_duration(&self) -> Duration {
        seconds_or(self.ripple_secs, Settings::default().ripple_secs)
    }

    pub fn keystroke_duration(&self) -> Duration {
        seconds_or(self.keystroke_secs, Settings::default().keystroke_secs)
    }

    /// Parse settings from JSON. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> crate::Result<Settings> {
        serde_json::from_str(json).map_err(|e| crate::Error::InvalidSettings(e.to_string()))
    }

    #[cfg(feature = "serde")]
    pub fn to_json_string(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::InvalidSettings(e.to_string()))
    }
}

/// Read-only view of the host's settings.
pub trait SettingsSource {
    /// The settings as they are right now.
    fn snapshot(&self) -> Settings;
}

impl SettingsSource for Settings {
    fn snapshot(&self) -> Settings {
        self.clone()
    }
}

/// Settings the host can change while the engine runs.
///
/// Clones share the same settings.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Apply `change` to the shared settings.
    pub fn update(&self, change: impl FnOnce(&mut Settings)) {
        match self.inner.write() {
            Ok(mut guard) => change(&mut guard),
            Err(poisoned) => change(&mut poisoned.into_inner()),
        }
    }
}

impl SettingsSource for SharedSettings {
    fn snapshot(&self) -> Settings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_at_point_of_use() {
        let settings = Settings {
            radius: 2.0,
            dim_opacity: 3.0,
            edge_blur: -0.5,
            ..Settings::default()
        };
        assert_eq!(settings.clamped_radius(), MIN_RADIUS);
        assert_eq!(settings.clamped_dim_opacity(), MAX_DIM_OPACITY);
        assert_eq!(settings.clamped_edge_blur(), 0.0);
    }

    #[test]
    fn test_non_finite_values_fall_back() {
        let settings = Settings {
            radius: f64::NAN,
            activation_secs: f64::INFINITY,
            ..Settings::default()
        };
        assert_eq!(settings.clamped_radius(), Settings::default().radius);
        assert_eq!(settings.activation_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_auto_deactivate_range() {
        let mut settings = Settings::default();
        assert_eq!(settings.auto_deactivate_after(), None);

        settings.auto_deactivate = true;
        settings.auto_deactivate_secs = 0.2;
        assert_eq!(settings.auto_deactivate_after(), Some(Duration::from_secs(1)));
        settings.auto_deactivate_secs = 1000.0;
        assert_eq!(settings.auto_deactivate_after(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_shared_settings_update_visible_to_clones() {
        let shared = SharedSettings::default();
        let reader = shared.clone();
        shared.update(|s| s.shape = SpotlightShape::Star);
        assert_eq!(reader.snapshot().shape, SpotlightShape::Star);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_partial_document() {
        let settings = Settings::from_json_str(r#"{ "radius": 80.0, "shape": "cloud" }"#).unwrap();
        assert_eq!(settings.radius, 80.0);
        assert_eq!(settings.shape, SpotlightShape::Cloud);
        assert_eq!(settings.dim_opacity, Settings::default().dim_opacity);

        assert!(Settings::from_json_str("{ not json").is_err());

        let saved = settings.to_json_string().unwrap();
        assert_eq!(Settings::from_json_str(&saved).unwrap(), settings);
    }
}

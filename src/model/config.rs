use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub focus: FocusConfig,
    pub visibility: VisibilityConfig,
    pub layout: LayoutConfig,
    pub gestures: GestureConfig,
    pub ambient: AmbientConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub scratch_file: String,
    pub tick_ms: u64,
    pub reparse_debounce_ms: u64,
    pub double_click_ms: u64,
    /// Key that latches the depth modifier on terminals without key release events.
    pub depth_latch_key: String,
    pub xray_latch_key: String,
    /// Stands in for a bare Shift press.
    pub sonar_tap_key: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            scratch_file: "scratch.md".to_string(),
            tick_ms: 33,
            reparse_debounce_ms: 500,
            double_click_ms: 400,
            depth_latch_key: "F2".to_string(),
            xray_latch_key: "F3".to_string(),
            sonar_tap_key: "F4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Depth reached the instant the modifier goes down.
    pub peek_depth: f32,
    /// Depth change per unit of wheel delta.
    pub scroll_scale: f32,
    /// Fraction of the remaining depth removed per idle tick.
    pub decay: f32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            peek_depth: 0.98,
            scroll_scale: 0.0008,
            decay: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    pub ghost_floor: f32,
    pub lantern_strength: f32,
    pub lantern_radius: u16,
    pub xray_opacity: f32,
    pub pointer_threshold: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            ghost_floor: 0.15,
            lantern_strength: 0.85,
            lantern_radius: 10,
            xray_opacity: 0.3,
            pointer_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub columns: usize,
    pub animations: bool,
    /// Pointer distance (cells) beyond which a card no longer tilts.
    pub tilt_falloff: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 4,
            animations: true,
            tilt_falloff: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub sonar_window_ms: u64,
    pub sonar_pulse_ms: u64,
    pub portal_idle_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            sonar_window_ms: 400,
            sonar_pulse_ms: 1500,
            portal_idle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub lantern: bool,
    pub ghost: bool,
    pub rain_back: bool,
    pub rain_front: bool,
    /// 0 behind the rain, 1 between the layers, 2 in front.
    pub editor_depth: u8,
    pub fog: bool,
    pub fog_clear_radius: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            lantern: true,
            ghost: false,
            rain_back: true,
            rain_front: true,
            editor_depth: 1,
            fog: true,
            fog_clear_radius: 4.0,
        }
    }
}

impl AppConfig {
    /// Load configuration with layering: embedded defaults → user config.
    ///
    /// `explicit` replaces the platform config path; unlike the platform
    /// file it must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = match explicit {
            Some(path) => Some(read_config(path)?),
            None => match Self::user_config_path() {
                Some(path) if path.exists() => Some(read_config(&path)?),
                _ => None,
            },
        };

        Self::from_layers(user.as_deref())
    }

    /// Merge an optional user document over the embedded defaults.
    pub fn from_layers(user: Option<&str>) -> Result<Self> {
        let mut merged = parse_value(DEFAULTS, "defaults")?;
        if let Some(user) = user {
            merge(&mut merged, parse_value(user, "user config")?);
        }

        let config = merged.try_into::<AppConfig>().map_err(|source| Error::ConfigParse {
            origin: "merged config".to_string(),
            source,
        })?;

        Ok(config.sanitized())
    }

    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rainedit")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "rainedit")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("rainedit"))
    }

    pub fn scratch_path(&self) -> PathBuf {
        Self::data_dir().join(&self.general.scratch_file)
    }

    /// Clamp values that would break the engine's invariants.
    fn sanitized(mut self) -> Self {
        self.general.tick_ms = self.general.tick_ms.clamp(5, 1000);
        self.focus.peek_depth = self.focus.peek_depth.clamp(0.0, 1.0);
        self.focus.scroll_scale = self.focus.scroll_scale.max(0.0);
        self.focus.decay = self.focus.decay.clamp(0.01, 1.0);
        self.visibility.ghost_floor = self.visibility.ghost_floor.clamp(0.0, 1.0);
        self.visibility.lantern_strength = self.visibility.lantern_strength.clamp(0.0, 1.0);
        self.visibility.xray_opacity = self.visibility.xray_opacity.clamp(0.0, 1.0);
        self.visibility.pointer_threshold = self.visibility.pointer_threshold.clamp(0.0, 1.0);
        self.layout.columns = self.layout.columns.clamp(1, 12);
        self.layout.tilt_falloff = self.layout.tilt_falloff.max(1.0);
        self.ambient.editor_depth = self.ambient.editor_depth.min(2);
        self.ambient.fog_clear_radius = self.ambient.fog_clear_radius.max(0.0);
        self
    }
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_value(text: &str, origin: &str) -> Result<toml::Value> {
    text.parse::<toml::Value>()
        .map_err(|source| Error::ConfigParse {
            origin: origin.to_string(),
            source,
        })
}

/// Deep-merge `over` into `base`; tables merge per key, everything else replaces.
fn merge(base: &mut toml::Value, over: toml::Value) {
    match (base, over) {
        (toml::Value::Table(base), toml::Value::Table(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, over) => *base = over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let config = AppConfig::from_layers(None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_user_layer_overrides_single_key() {
        let config = AppConfig::from_layers(Some("[focus]\npeek_depth = 0.9\n")).unwrap();
        assert_eq!(config.focus.peek_depth, 0.9);
        assert_eq!(config.focus.decay, FocusConfig::default().decay);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = AppConfig::from_layers(Some(
            "[focus]\npeek_depth = 4.0\n[layout]\ncolumns = 0\n[ambient]\neditor_depth = 9\n",
        ))
        .unwrap();
        assert_eq!(config.focus.peek_depth, 1.0);
        assert_eq!(config.layout.columns, 1);
        assert_eq!(config.ambient.editor_depth, 2);
    }

    #[test]
    fn test_invalid_user_config_is_reported() {
        let err = AppConfig::from_layers(Some("[focus\n")).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ambient]\nrain_front = false").unwrap();
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert!(!config.ambient.rain_front);
        assert!(config.ambient.rain_back);
        assert!(config.ambient.fog);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}

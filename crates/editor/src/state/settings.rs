//! Editor settings

use std::path::Path;

use serde::{Deserialize, Serialize};

/// History log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Entries kept before the oldest is evicted
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

impl HistorySettings {
    pub const MAX_CAPACITY: usize = super::scene::MAX_CAPACITY;
}

/// Orbit camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Radians per pixel of pointer movement
    pub orbit_speed: f32,
    /// Radius change per wheel delta unit
    pub zoom_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Field of view in degrees
    pub fov_degrees: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            orbit_speed: 0.005,
            zoom_speed: 0.01,
            min_radius: 2.0,
            max_radius: 50.0,
            fov_degrees: 45.0,
        }
    }
}

impl CameraSettings {
    /// Replace unusable values: non-finite or non-positive radii fall back to
    /// the defaults and inverted bounds are swapped
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if !usable(self.min_radius) || !usable(self.max_radius) {
            self.min_radius = defaults.min_radius;
            self.max_radius = defaults.max_radius;
        }
        if self.min_radius > self.max_radius {
            std::mem::swap(&mut self.min_radius, &mut self.max_radius);
        }
        if !self.orbit_speed.is_finite() {
            self.orbit_speed = defaults.orbit_speed;
        }
        if !self.zoom_speed.is_finite() {
            self.zoom_speed = defaults.zoom_speed;
        }
        if !(self.fov_degrees > 1.0 && self.fov_degrees < 179.0) {
            self.fov_degrees = defaults.fov_degrees;
        }
    }
}

/// Cross-tab collaboration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Channel shared by all tabs of one workspace
    pub channel: String,
    /// Name shown to other participants
    pub user_name: String,
    /// Peers silent for longer than this are dropped
    pub presence_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            channel: "scene-editor-sync".to_string(),
            user_name: "Guest".to_string(),
            presence_timeout_ms: 5000,
            heartbeat_interval_ms: 1000,
        }
    }
}

/// Imported model presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Loaded models are scaled so their largest dimension is at most this
    pub max_dimension: f32,
    /// Blend factor from the model's own color toward the object color
    pub color_blend: f32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_dimension: 2.0,
            color_blend: 0.5,
        }
    }
}

impl ImportSettings {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.max_dimension.is_finite() && self.max_dimension > 0.0) {
            self.max_dimension = defaults.max_dimension;
        }
        if !(0.0..=1.0).contains(&self.color_blend) {
            self.color_blend = defaults.color_blend;
        }
    }
}

/// All editor settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub history: HistorySettings,
    pub camera: CameraSettings,
    pub sync: SyncSettings,
    pub import: ImportSettings,
}

impl EditorSettings {
    /// Parse settings JSON and bring every value into its usable range
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn sanitize(&mut self) {
        self.history.capacity = self.history.capacity.clamp(1, HistorySettings::MAX_CAPACITY);
        self.camera.sanitize();
        self.import.sanitize();
    }

    /// Read settings from `path`; missing or malformed files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(_) => return Self::default(),
        };
        match Self::from_json(&json) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring malformed settings: {e}");
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Settings file in the platform config directory
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        directories::ProjectDirs::from("com", "scene-editor", "scene-editor")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from the config directory, or defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        if let Some(path) = Self::default_path() {
            if let Err(e) = self.save_to(&path) {
                tracing::warn!("failed to save settings: {e}");
            }
        }
    }
}

//! Persisted viewer settings.
//!
//! Saved as RON next to the working directory on exit and reloaded on
//! startup. A missing file means defaults; a malformed file is logged
//! and replaced with defaults rather than blocking startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ui::camera::CameraPreset;

pub const CONFIG_FILE: &str = "nanoscope.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Ron(#[from] ron::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub substrate_opacity: f32,
    pub selected_field: Option<String>,
    pub show_trails: bool,
    pub detailed: bool,
    pub playback_speed: f32,
    pub camera_preset: CameraPreset,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: 1600,
            window_height: 900,
            substrate_opacity: 0.7,
            selected_field: Some("oxygen".to_string()),
            show_trails: true,
            detailed: true,
            playback_speed: 1.0,
            camera_preset: CameraPreset::Isometric,
        }
    }
}

impl ViewerConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Load from disk, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match ron::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("ignoring malformed config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                log::warn!("could not read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Clamp loaded values into ranges the UI can actually represent.
    pub fn sanitized(mut self) -> Self {
        self.substrate_opacity = self.substrate_opacity.clamp(0.0, 1.0);
        self.playback_speed = self.playback_speed.clamp(0.25, 8.0);
        self.window_width = self.window_width.max(320);
        self.window_height = self.window_height.max(240);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_ron() {
        let dir = std::env::temp_dir().join("nanoscope-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);

        let mut config = ViewerConfig::default();
        config.substrate_opacity = 0.4;
        config.camera_preset = CameraPreset::TopDown;
        config.selected_field = Some("drug".to_string());
        config.save(&path).unwrap();

        let loaded = ViewerConfig::load(&path);
        assert_eq!(loaded.substrate_opacity, 0.4);
        assert_eq!(loaded.camera_preset, CameraPreset::TopDown);
        assert_eq!(loaded.selected_field.as_deref(), Some("drug"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = ViewerConfig::load(Path::new("/nonexistent/nanoscope.ron"));
        assert_eq!(config.playback_speed, 1.0);
        assert!(config.show_trails);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = std::env::temp_dir().join("nanoscope-config-bad");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, "this is not ron {{{").unwrap();
        let config = ViewerConfig::load(&path);
        assert_eq!(config.window_width, 1600);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let config = ViewerConfig {
            substrate_opacity: 9.0,
            playback_speed: 0.0,
            window_width: 10,
            ..ViewerConfig::default()
        }
        .sanitized();
        assert_eq!(config.substrate_opacity, 1.0);
        assert_eq!(config.playback_speed, 0.25);
        assert_eq!(config.window_width, 320);
    }
}

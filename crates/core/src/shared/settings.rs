use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detection_config::DetectionConfig;
use crate::orientation::domain::device_orientation::CameraFacing;
use crate::shared::constants::{
    AUDIO_CHANNELS, AUDIO_SAMPLE_RATE, RECORDING_START_DELAY, SETTINGS_DIR_NAME,
    SETTINGS_FILE_NAME, VIDEO_HEIGHT, VIDEO_WIDTH,
};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid detection options: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("option {key} out of range: {value}")]
    OutOfRange { key: &'static str, value: f64 },

    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted defaults for a pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_facing: CameraFacing,
    pub detection: DetectionConfig,
    /// Where recordings land; `None` means the documents directory.
    pub output_dir: Option<PathBuf>,
    pub video_width: u32,
    pub video_height: u32,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    pub start_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_facing: CameraFacing::Back,
            detection: DetectionConfig::default(),
            output_dir: None,
            video_width: VIDEO_WIDTH,
            video_height: VIDEO_HEIGHT,
            audio_sample_rate: AUDIO_SAMPLE_RATE,
            audio_channels: AUDIO_CHANNELS,
            start_delay_ms: RECORDING_START_DELAY.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Loads the user's settings, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| match Self::load_from(&path) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    log::debug!("using default settings: {e}");
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => {
                log::warn!("no config directory available; settings not saved");
                Ok(())
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            SettingsError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_config::ContourMode;

    #[test]
    fn test_defaults_match_constants() {
        let settings = Settings::default();
        assert_eq!(settings.video_width, 1280);
        assert_eq!(settings.video_height, 720);
        assert_eq!(settings.audio_sample_rate, 16000);
        assert_eq!(settings.audio_channels, 1);
        assert_eq!(settings.start_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.camera_facing = CameraFacing::Front;
        settings.detection.contour_mode = ContourMode::All;
        settings.output_dir = Some(dir.path().to_path_buf());

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"camera_facing": "front"}"#).unwrap();

        let loaded = Settings::load_from(&path).unwrap();

        assert_eq!(loaded.camera_facing, CameraFacing::Front);
        assert_eq!(loaded.detection, DetectionConfig::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load_from(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(SettingsError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let result = Settings::load_from(&path);

        assert!(matches!(result, Err(SettingsError::Malformed { .. })));
    }
}

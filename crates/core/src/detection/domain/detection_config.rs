use serde::{Deserialize, Serialize};

use crate::shared::settings::SettingsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    #[default]
    Fast,
    Accurate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LandmarkMode {
    None,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContourMode {
    #[default]
    None,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMode {
    #[default]
    None,
    All,
}

impl PerformanceMode {
    pub const ALL: [PerformanceMode; 2] = [PerformanceMode::Fast, PerformanceMode::Accurate];

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceMode::Fast => "fast",
            PerformanceMode::Accurate => "accurate",
        }
    }
}

impl LandmarkMode {
    pub const ALL: [LandmarkMode; 2] = [LandmarkMode::None, LandmarkMode::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            LandmarkMode::None => "none",
            LandmarkMode::All => "all",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self == LandmarkMode::All
    }
}

impl ContourMode {
    pub const ALL: [ContourMode; 2] = [ContourMode::None, ContourMode::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContourMode::None => "none",
            ContourMode::All => "all",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self == ContourMode::All
    }
}

impl ClassificationMode {
    pub const ALL: [ClassificationMode; 2] = [ClassificationMode::None, ClassificationMode::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMode::None => "none",
            ClassificationMode::All => "all",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self == ClassificationMode::All
    }
}

/// Immutable snapshot of the options the detection capability runs with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionConfig {
    pub performance_mode: PerformanceMode,
    pub landmark_mode: LandmarkMode,
    pub contour_mode: ContourMode,
    pub classification_mode: ClassificationMode,
    /// Smallest face to report, as head width over image width.
    pub min_face_size: f32,
    #[serde(rename = "isTrackingEnabled")]
    pub tracking_enabled: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            performance_mode: PerformanceMode::Fast,
            landmark_mode: LandmarkMode::All,
            contour_mode: ContourMode::None,
            classification_mode: ClassificationMode::None,
            min_face_size: 0.2,
            tracking_enabled: false,
        }
    }
}

impl DetectionConfig {
    /// Overlays the keys present in `options`; absent keys keep their value.
    pub fn merge(&self, options: &DetectionOptions) -> Self {
        Self {
            performance_mode: options.performance_mode.unwrap_or(self.performance_mode),
            landmark_mode: options.landmark_mode.unwrap_or(self.landmark_mode),
            contour_mode: options.contour_mode.unwrap_or(self.contour_mode),
            classification_mode: options
                .classification_mode
                .unwrap_or(self.classification_mode),
            min_face_size: options.min_face_size.unwrap_or(self.min_face_size),
            tracking_enabled: options.is_tracking_enabled.unwrap_or(self.tracking_enabled),
        }
    }
}

/// Partial option bag as passed by the caller. Unknown keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_mode: Option<PerformanceMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark_mode: Option<LandmarkMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contour_mode: Option<ContourMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_mode: Option<ClassificationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_face_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_tracking_enabled: Option<bool>,
}

impl DetectionOptions {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let options: Self = serde_json::from_str(json).map_err(SettingsError::InvalidOptions)?;
        if let Some(size) = options.min_face_size {
            if !(0.0..=1.0).contains(&size) {
                return Err(SettingsError::OutOfRange {
                    key: "minFaceSize",
                    value: size as f64,
                });
            }
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.performance_mode, PerformanceMode::Fast);
        assert_eq!(config.landmark_mode, LandmarkMode::All);
        assert_eq!(config.contour_mode, ContourMode::None);
        assert_eq!(config.classification_mode, ClassificationMode::None);
        assert_relative_eq!(config.min_face_size, 0.2);
        assert!(!config.tracking_enabled);
    }

    #[test]
    fn test_merge_keeps_missing_keys() {
        let base = DetectionConfig {
            contour_mode: ContourMode::All,
            ..DetectionConfig::default()
        };
        let options = DetectionOptions::from_json(r#"{"minFaceSize": 0.5}"#).unwrap();

        let merged = base.merge(&options);

        assert_relative_eq!(merged.min_face_size, 0.5);
        assert_eq!(merged.contour_mode, ContourMode::All);
        assert_eq!(merged.landmark_mode, LandmarkMode::All);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options = DetectionOptions::from_json(
            r#"{"performanceMode": "accurate", "flashMode": "on", "isTrackingEnabled": true}"#,
        )
        .unwrap();

        let merged = DetectionConfig::default().merge(&options);

        assert_eq!(merged.performance_mode, PerformanceMode::Accurate);
        assert!(merged.tracking_enabled);
    }

    #[test]
    fn test_unrecognised_mode_is_rejected() {
        let result = DetectionOptions::from_json(r#"{"landmarkMode": "some"}"#);
        assert!(matches!(result, Err(SettingsError::InvalidOptions(_))));
    }

    #[test]
    fn test_min_face_size_out_of_range_is_rejected() {
        let result = DetectionOptions::from_json(r#"{"minFaceSize": 1.5}"#);
        assert!(matches!(
            result,
            Err(SettingsError::OutOfRange { key: "minFaceSize", .. })
        ));
    }

    #[test]
    fn test_config_serializes_with_bridge_keys() {
        let json = serde_json::to_value(DetectionConfig::default()).unwrap();
        assert_eq!(json["performanceMode"], "fast");
        assert_eq!(json["landmarkMode"], "all");
        assert_eq!(json["isTrackingEnabled"], false);
    }

    #[test]
    fn test_mode_tables() {
        let names: Vec<_> = PerformanceMode::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, ["fast", "accurate"]);
        assert!(ContourMode::All.is_enabled());
        assert!(!ClassificationMode::None.is_enabled());
        assert_eq!(LandmarkMode::ALL.len(), 2);
    }
}

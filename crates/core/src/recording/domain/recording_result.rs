use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Caller-supplied options for one recording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingOptions {
    /// Directory for the output file, overriding the configured one.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRecordingResult {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StartRecordingResult {
    pub fn started() -> Self {
        Self {
            started: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            started: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecordingResult {
    pub has_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StopRecordingResult {
    pub fn completed(path: impl Into<String>) -> Self {
        Self {
            has_error: false,
            path: Some(path.into()),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            has_error: true,
            path: None,
            error_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_result_bridge_shape() {
        let json = serde_json::to_value(StopRecordingResult::completed("/tmp/a.mov")).unwrap();
        assert_eq!(json["hasError"], false);
        assert_eq!(json["path"], "/tmp/a.mov");
        assert!(json.get("errorMessage").is_none());

        let json = serde_json::to_value(StopRecordingResult::failed("disk full")).unwrap();
        assert_eq!(json["hasError"], true);
        assert_eq!(json["errorMessage"], "disk full");
    }

    #[test]
    fn test_rejected_start_carries_message() {
        let result = StartRecordingResult::rejected("already recording");
        assert!(!result.started);
        assert_eq!(result.error.as_deref(), Some("already recording"));
    }

    #[test]
    fn test_options_accept_camel_case() {
        let options: RecordingOptions =
            serde_json::from_str(r#"{"outputDir": "/videos", "quality": "high"}"#).unwrap();
        assert_eq!(options.output_dir, Some(PathBuf::from("/videos")));
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Physical orientation of the device, as reported by its motion sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl DeviceOrientation {
    pub const ALL: [DeviceOrientation; 7] = [
        DeviceOrientation::Portrait,
        DeviceOrientation::PortraitUpsideDown,
        DeviceOrientation::LandscapeLeft,
        DeviceOrientation::LandscapeRight,
        DeviceOrientation::FaceUp,
        DeviceOrientation::FaceDown,
        DeviceOrientation::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceOrientation::Portrait => "portrait",
            DeviceOrientation::PortraitUpsideDown => "portraitUpsideDown",
            DeviceOrientation::LandscapeLeft => "landscapeLeft",
            DeviceOrientation::LandscapeRight => "landscapeRight",
            DeviceOrientation::FaceUp => "faceUp",
            DeviceOrientation::FaceDown => "faceDown",
            DeviceOrientation::Unknown => "unknown",
        }
    }

    pub(crate) fn to_index(self) -> u8 {
        Self::ALL.iter().position(|o| *o == self).unwrap_or(6) as u8
    }

    pub(crate) fn from_index(index: u8) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(DeviceOrientation::Unknown)
    }
}

impl fmt::Display for DeviceOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown device orientation: {s}"))
    }
}

/// Which physical camera feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Back,
    Front,
}

impl CameraFacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraFacing::Back => "back",
            CameraFacing::Front => "front",
        }
    }

    pub(crate) fn to_index(self) -> u8 {
        match self {
            CameraFacing::Back => 0,
            CameraFacing::Front => 1,
        }
    }

    pub(crate) fn from_index(index: u8) -> Self {
        if index == 1 {
            CameraFacing::Front
        } else {
            CameraFacing::Back
        }
    }
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back" => Ok(CameraFacing::Back),
            "front" => Ok(CameraFacing::Front),
            _ => Err(format!("unknown camera facing: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_parses_case_insensitively() {
        assert_eq!(
            "landscapeleft".parse::<DeviceOrientation>(),
            Ok(DeviceOrientation::LandscapeLeft)
        );
        assert!("sideways".parse::<DeviceOrientation>().is_err());
    }

    #[test]
    fn test_orientation_index_roundtrip_covers_all() {
        for orientation in DeviceOrientation::ALL {
            assert_eq!(
                DeviceOrientation::from_index(orientation.to_index()),
                orientation
            );
        }
        assert_eq!(DeviceOrientation::from_index(42), DeviceOrientation::Unknown);
    }

    #[test]
    fn test_facing_serde_uses_lowercase() {
        let json = serde_json::to_string(&CameraFacing::Front).unwrap();
        assert_eq!(json, "\"front\"");
        let parsed: CameraFacing = serde_json::from_str("\"back\"").unwrap();
        assert_eq!(parsed, CameraFacing::Back);
    }

    #[test]
    fn test_facing_from_str() {
        assert_eq!("BACK".parse::<CameraFacing>(), Ok(CameraFacing::Back));
        assert!("side".parse::<CameraFacing>().is_err());
    }
}

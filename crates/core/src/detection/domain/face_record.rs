use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LandmarkKind {
    NoseBase,
    MouthLeft,
    MouthRight,
    MouthBottom,
    LeftEar,
    RightEar,
    LeftEye,
    RightEye,
    LeftCheek,
    RightCheek,
}

impl LandmarkKind {
    pub const ALL: [LandmarkKind; 10] = [
        LandmarkKind::NoseBase,
        LandmarkKind::MouthLeft,
        LandmarkKind::MouthRight,
        LandmarkKind::MouthBottom,
        LandmarkKind::LeftEar,
        LandmarkKind::RightEar,
        LandmarkKind::LeftEye,
        LandmarkKind::RightEye,
        LandmarkKind::LeftCheek,
        LandmarkKind::RightCheek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LandmarkKind::NoseBase => "NOSE_BASE",
            LandmarkKind::MouthLeft => "MOUTH_LEFT",
            LandmarkKind::MouthRight => "MOUTH_RIGHT",
            LandmarkKind::MouthBottom => "MOUTH_BOTTOM",
            LandmarkKind::LeftEar => "LEFT_EAR",
            LandmarkKind::RightEar => "RIGHT_EAR",
            LandmarkKind::LeftEye => "LEFT_EYE",
            LandmarkKind::RightEye => "RIGHT_EYE",
            LandmarkKind::LeftCheek => "LEFT_CHEEK",
            LandmarkKind::RightCheek => "RIGHT_CHEEK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContourKind {
    Face,
    LeftEye,
    LeftEyebrowBottom,
    LeftEyebrowTop,
    RightEye,
    RightEyebrowBottom,
    RightEyebrowTop,
    NoseBottom,
    NoseBridge,
    UpperLipTop,
    UpperLipBottom,
    LowerLipTop,
    LowerLipBottom,
}

impl ContourKind {
    pub const ALL: [ContourKind; 13] = [
        ContourKind::Face,
        ContourKind::LeftEye,
        ContourKind::LeftEyebrowBottom,
        ContourKind::LeftEyebrowTop,
        ContourKind::RightEye,
        ContourKind::RightEyebrowBottom,
        ContourKind::RightEyebrowTop,
        ContourKind::NoseBottom,
        ContourKind::NoseBridge,
        ContourKind::UpperLipTop,
        ContourKind::UpperLipBottom,
        ContourKind::LowerLipTop,
        ContourKind::LowerLipBottom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContourKind::Face => "FACE",
            ContourKind::LeftEye => "LEFT_EYE",
            ContourKind::LeftEyebrowBottom => "LEFT_EYEBROW_BOTTOM",
            ContourKind::LeftEyebrowTop => "LEFT_EYEBROW_TOP",
            ContourKind::RightEye => "RIGHT_EYE",
            ContourKind::RightEyebrowBottom => "RIGHT_EYEBROW_BOTTOM",
            ContourKind::RightEyebrowTop => "RIGHT_EYEBROW_TOP",
            ContourKind::NoseBottom => "NOSE_BOTTOM",
            ContourKind::NoseBridge => "NOSE_BRIDGE",
            ContourKind::UpperLipTop => "UPPER_LIP_TOP",
            ContourKind::UpperLipBottom => "UPPER_LIP_BOTTOM",
            ContourKind::LowerLipTop => "LOWER_LIP_TOP",
            ContourKind::LowerLipBottom => "LOWER_LIP_BOTTOM",
        }
    }
}

/// A point in image pixel coordinates, with optional depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacePoint {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl FacePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }
}

/// One detected face. Every optional attribute is `None` unless the
/// detector reported it, so a reported zero stays distinguishable from
/// an absent value.
///
/// Deserializes from a plain shape (`trackingId`, `landmarks` mapping kind
/// to point, `contours` mapping kind to points). Serializes to the bridge
/// shape with `has*` presence flags.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaceRecord {
    pub tracking_id: Option<i64>,
    pub head_euler_angle_y: Option<f32>,
    pub head_euler_angle_z: Option<f32>,
    pub smiling_probability: Option<f32>,
    pub left_eye_open_probability: Option<f32>,
    pub right_eye_open_probability: Option<f32>,
    pub landmarks: BTreeMap<LandmarkKind, FacePoint>,
    pub contours: BTreeMap<ContourKind, Vec<FacePoint>>,
}

/// Axis-aligned extent of a face's reported points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceExtent {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl FaceExtent {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

impl FaceRecord {
    /// Applies `f` to every landmark and contour point.
    pub fn map_points(mut self, f: impl Fn(FacePoint) -> FacePoint) -> Self {
        for point in self.landmarks.values_mut() {
            *point = f(*point);
        }
        for points in self.contours.values_mut() {
            for point in points.iter_mut() {
                *point = f(*point);
            }
        }
        self
    }

    fn points(&self) -> impl Iterator<Item = &FacePoint> {
        self.landmarks
            .values()
            .chain(self.contours.values().flat_map(|points| points.iter()))
    }

    /// Bounding box of all landmark and contour points, if any were reported.
    pub fn extent(&self) -> Option<FaceExtent> {
        self.points().fold(None, |acc, p| {
            Some(match acc {
                None => FaceExtent {
                    min_x: p.x,
                    min_y: p.y,
                    max_x: p.x,
                    max_y: p.y,
                },
                Some(e) => FaceExtent {
                    min_x: e.min_x.min(p.x),
                    min_y: e.min_y.min(p.y),
                    max_x: e.max_x.max(p.x),
                    max_y: e.max_y.max(p.y),
                },
            })
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BridgeFace<'a> {
    has_tracking_id: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracking_id: Option<i64>,
    has_head_euler_angle_y: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_euler_angle_y: Option<f32>,
    has_head_euler_angle_z: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_euler_angle_z: Option<f32>,
    has_smiling_probability: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    smiling_probability: Option<f32>,
    has_left_eye_open_probability: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    left_eye_open_probability: Option<f32>,
    has_right_eye_open_probability: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    right_eye_open_probability: Option<f32>,
    landmarks: BTreeMap<LandmarkKind, BridgeLandmark<'a>>,
    contours: BTreeMap<ContourKind, BridgeContour<'a>>,
}

#[derive(Serialize)]
struct BridgeLandmark<'a> {
    #[serde(rename = "type")]
    kind: LandmarkKind,
    position: &'a FacePoint,
}

#[derive(Serialize)]
struct BridgeContour<'a> {
    #[serde(rename = "type")]
    kind: ContourKind,
    points: &'a [FacePoint],
}

impl Serialize for FaceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BridgeFace {
            has_tracking_id: self.tracking_id.is_some(),
            tracking_id: self.tracking_id,
            has_head_euler_angle_y: self.head_euler_angle_y.is_some(),
            head_euler_angle_y: self.head_euler_angle_y,
            has_head_euler_angle_z: self.head_euler_angle_z.is_some(),
            head_euler_angle_z: self.head_euler_angle_z,
            has_smiling_probability: self.smiling_probability.is_some(),
            smiling_probability: self.smiling_probability,
            has_left_eye_open_probability: self.left_eye_open_probability.is_some(),
            left_eye_open_probability: self.left_eye_open_probability,
            has_right_eye_open_probability: self.right_eye_open_probability.is_some(),
            right_eye_open_probability: self.right_eye_open_probability,
            landmarks: self
                .landmarks
                .iter()
                .map(|(kind, position)| {
                    (
                        *kind,
                        BridgeLandmark {
                            kind: *kind,
                            position,
                        },
                    )
                })
                .collect(),
            contours: self
                .contours
                .iter()
                .map(|(kind, points)| {
                    (
                        *kind,
                        BridgeContour {
                            kind: *kind,
                            points,
                        },
                    )
                })
                .collect(),
        }
        .serialize(serializer)
    }
}

//! Single table mapping (device orientation, camera facing) to everything
//! orientation-dependent in the pipeline: the image orientation tag handed
//! to the detector, the mirror flags used to remap detector coordinates,
//! and the rotation stored on the recorded video track.
//!
//! Both the detection and the recording paths read the same entry, so the
//! live overlay and the stored video can never disagree about mirroring.

use serde::{Deserialize, Serialize};

use crate::orientation::domain::device_orientation::{CameraFacing, DeviceOrientation};

/// EXIF-style orientation of the captured image: which corner of the stored
/// pixel buffer is the visual top-left (row side first, column side second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageOrientation {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    LeftTop,
    RightTop,
    RightBottom,
    LeftBottom,
}

impl ImageOrientation {
    /// The numeric EXIF orientation tag (1-8).
    pub fn exif_tag(&self) -> u8 {
        match self {
            ImageOrientation::TopLeft => 1,
            ImageOrientation::TopRight => 2,
            ImageOrientation::BottomRight => 3,
            ImageOrientation::BottomLeft => 4,
            ImageOrientation::LeftTop => 5,
            ImageOrientation::RightTop => 6,
            ImageOrientation::RightBottom => 7,
            ImageOrientation::LeftBottom => 8,
        }
    }
}

/// Rotation applied to the recorded video track so playback is upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VideoRotation {
    Identity,
    Quarter,
    NegativeQuarter,
    NegativeHalf,
}

impl VideoRotation {
    /// Signed rotation angle in degrees.
    pub fn degrees(&self) -> i32 {
        match self {
            VideoRotation::Identity => 0,
            VideoRotation::Quarter => 90,
            VideoRotation::NegativeQuarter => -90,
            VideoRotation::NegativeHalf => -180,
        }
    }

    /// The same angle normalized into `0..360`, as container rotate tags expect.
    pub fn normalized_degrees(&self) -> i32 {
        self.degrees().rem_euclid(360)
    }

    pub fn radians(&self) -> f64 {
        (self.degrees() as f64).to_radians()
    }

    /// Affine rotation matrix `[a, b, c, d, tx, ty]`.
    pub fn affine(&self) -> [f64; 6] {
        let (sin, cos) = match self {
            VideoRotation::Identity => (0.0, 1.0),
            VideoRotation::Quarter => (1.0, 0.0),
            VideoRotation::NegativeQuarter => (-1.0, 0.0),
            VideoRotation::NegativeHalf => (0.0, -1.0),
        };
        [cos, sin, -sin, cos, 0.0, 0.0]
    }

    /// The affine transform as a 3x3 display matrix in QuickTime layout:
    /// 16.16 fixed point, with 2.30 for the last column.
    pub fn display_matrix(&self) -> [i32; 9] {
        let [a, b, c, d, ..] = self.affine();
        let fixed = |v: f64| (v * 65536.0).round() as i32;
        [fixed(a), fixed(b), 0, fixed(c), fixed(d), 0, 0, 0, 1 << 30]
    }

    /// True when the rotation exchanges the frame's width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, VideoRotation::Quarter | VideoRotation::NegativeQuarter)
    }
}

/// Everything orientation-dependent for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationState {
    pub image_orientation: ImageOrientation,
    pub horizontal_mirrored: bool,
    pub vertical_mirrored: bool,
    pub video_rotation: VideoRotation,
}

impl OrientationState {
    const fn entry(
        image_orientation: ImageOrientation,
        horizontal_mirrored: bool,
        video_rotation: VideoRotation,
    ) -> Self {
        Self {
            image_orientation,
            horizontal_mirrored,
            vertical_mirrored: false,
            video_rotation,
        }
    }

    /// An image that needs neither rotation nor mirroring (still images).
    pub const fn upright() -> Self {
        Self::entry(ImageOrientation::TopLeft, false, VideoRotation::Identity)
    }

    pub fn swaps_axes(&self) -> bool {
        self.video_rotation.swaps_axes()
    }

    /// Frame dimensions as seen after rotation.
    pub fn oriented_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Entry used for face-up, face-down and unknown orientations.
const DEFAULT_STATE: OrientationState =
    OrientationState::entry(ImageOrientation::LeftTop, false, VideoRotation::Quarter);

const TABLE: [(DeviceOrientation, CameraFacing, OrientationState); 8] = [
    (
        DeviceOrientation::Portrait,
        CameraFacing::Front,
        OrientationState::entry(ImageOrientation::LeftTop, false, VideoRotation::Quarter),
    ),
    (
        DeviceOrientation::Portrait,
        CameraFacing::Back,
        OrientationState::entry(ImageOrientation::RightTop, true, VideoRotation::Quarter),
    ),
    (
        DeviceOrientation::PortraitUpsideDown,
        CameraFacing::Front,
        OrientationState::entry(
            ImageOrientation::RightBottom,
            false,
            VideoRotation::NegativeQuarter,
        ),
    ),
    (
        DeviceOrientation::PortraitUpsideDown,
        CameraFacing::Back,
        OrientationState::entry(
            ImageOrientation::LeftBottom,
            true,
            VideoRotation::NegativeQuarter,
        ),
    ),
    (
        DeviceOrientation::LandscapeLeft,
        CameraFacing::Front,
        OrientationState::entry(
            ImageOrientation::BottomRight,
            false,
            VideoRotation::NegativeHalf,
        ),
    ),
    (
        DeviceOrientation::LandscapeLeft,
        CameraFacing::Back,
        OrientationState::entry(ImageOrientation::TopLeft, true, VideoRotation::Identity),
    ),
    (
        DeviceOrientation::LandscapeRight,
        CameraFacing::Front,
        OrientationState::entry(ImageOrientation::TopLeft, false, VideoRotation::Identity),
    ),
    (
        DeviceOrientation::LandscapeRight,
        CameraFacing::Back,
        OrientationState::entry(
            ImageOrientation::BottomRight,
            true,
            VideoRotation::NegativeHalf,
        ),
    ),
];

/// Looks up the orientation state for a device orientation and camera.
pub fn map(device: DeviceOrientation, facing: CameraFacing) -> OrientationState {
    TABLE
        .iter()
        .find(|(o, f, _)| *o == device && *f == facing)
        .map(|(_, _, state)| *state)
        .unwrap_or(DEFAULT_STATE)
}

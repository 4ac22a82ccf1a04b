//! Converts raw detector coordinates into the caller's upright frame.

use crate::detection::domain::face_record::{FacePoint, FaceRecord};
use crate::orientation::domain::orientation_mapper::OrientationState;

/// Remaps one face detected in a `width` x `height` sensor frame.
///
/// Axes are exchanged when the orientation rotates by a quarter turn, then
/// each mirror flag reflects its axis across the rotated frame. The head's
/// yaw flips sign with a horizontal mirror.
pub fn remap_face(
    face: FaceRecord,
    state: &OrientationState,
    width: u32,
    height: u32,
) -> FaceRecord {
    let (out_width, out_height) = state.oriented_dimensions(width, height);
    let swap = state.swaps_axes();
    let horizontal = state.horizontal_mirrored;
    let vertical = state.vertical_mirrored;

    let mut face = face.map_points(|p| {
        let (mut x, mut y) = if swap { (p.y, p.x) } else { (p.x, p.y) };
        if horizontal {
            x = out_width as f32 - x;
        }
        if vertical {
            y = out_height as f32 - y;
        }
        FacePoint { x, y, z: p.z }
    });

    if horizontal {
        face.head_euler_angle_y = face.head_euler_angle_y.map(|angle| -angle);
    }
    face
}

pub fn remap_faces(
    faces: Vec<FaceRecord>,
    state: &OrientationState,
    width: u32,
    height: u32,
) -> Vec<FaceRecord> {
    faces
        .into_iter()
        .map(|face| remap_face(face, state, width, height))
        .collect()
}

use std::sync::atomic::{AtomicU8, Ordering};

use crate::orientation::domain::device_orientation::{CameraFacing, DeviceOrientation};
use crate::orientation::domain::orientation_mapper::{self, OrientationState};

/// Current device orientation and active camera, shared between the caller
/// context (which updates them) and the capture thread (which reads them for
/// every video frame).
pub struct OrientationTracker {
    device: AtomicU8,
    facing: AtomicU8,
}

impl OrientationTracker {
    pub fn new(device: DeviceOrientation, facing: CameraFacing) -> Self {
        Self {
            device: AtomicU8::new(device.to_index()),
            facing: AtomicU8::new(facing.to_index()),
        }
    }

    pub fn set_device_orientation(&self, orientation: DeviceOrientation) {
        self.device.store(orientation.to_index(), Ordering::Release);
    }

    pub fn set_camera_facing(&self, facing: CameraFacing) {
        self.facing.store(facing.to_index(), Ordering::Release);
    }

    pub fn device_orientation(&self) -> DeviceOrientation {
        DeviceOrientation::from_index(self.device.load(Ordering::Acquire))
    }

    pub fn camera_facing(&self) -> CameraFacing {
        CameraFacing::from_index(self.facing.load(Ordering::Acquire))
    }

    pub fn current(&self) -> OrientationState {
        orientation_mapper::map(self.device_orientation(), self.camera_facing())
    }
}

impl Default for OrientationTracker {
    fn default() -> Self {
        Self::new(DeviceOrientation::Portrait, CameraFacing::Back)
    }
}

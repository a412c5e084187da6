use glam::Vec3;

use crate::physics::ForceMode;

/// Orientation the movement intents are expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Default for CameraBasis {
    fn default() -> Self {
        Self {
            forward: Vec3::Z,
            right: Vec3::X,
            up: Vec3::Y,
        }
    }
}

impl CameraBasis {
    /// Basis of a camera turned `yaw` radians about the vertical axis.
    pub fn from_yaw(yaw: f32) -> Self {
        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        Self {
            forward: Vec3::new(sin_yaw, 0.0, cos_yaw),
            right: Vec3::new(cos_yaw, 0.0, -sin_yaw),
            up: Vec3::Y,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub move_force: f32,
    pub jump_threshold: f32,
    pub force_mode: ForceMode,
    pub camera: CameraBasis,
    pub spawn_position: Vec3,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_force: 0.5,
            jump_threshold: 0.75,
            force_mode: ForceMode::Impulse,
            camera: CameraBasis::default(),
            spawn_position: Vec3::new(0.0, 0.5, 0.0),
        }
    }
}

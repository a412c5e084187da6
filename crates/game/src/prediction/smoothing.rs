use glam::{Quat, Vec3};

pub const POSITION_DECAY: f32 = 0.9;
pub const ROTATION_DECAY: f32 = 0.1;
/// Squared distance at or beyond which a correction is shown as a hard snap.
pub const SNAP_DISTANCE_SQUARED: f32 = 4.0;

/// Visual-only offset between what was last shown and where the corrected body
/// actually is. Decays towards zero/identity; never fed back into physics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingError {
    pub position_offset: Vec3,
    pub rotation_offset: Quat,
}

impl Default for SmoothingError {
    fn default() -> Self {
        Self {
            position_offset: Vec3::ZERO,
            rotation_offset: Quat::IDENTITY,
        }
    }
}

impl SmoothingError {
    pub fn is_discontinuity(position_delta: Vec3) -> bool {
        position_delta.length_squared() >= SNAP_DISTANCE_SQUARED
    }

    /// Offset that keeps the rendered transform where it was before the body
    /// moved to `position`/`rotation`, unless the jump is too large to glide.
    pub fn after_correction(
        previous_position: Vec3,
        previous_rotation: Quat,
        position: Vec3,
        rotation: Quat,
    ) -> Self {
        let position_delta = previous_position - position;
        if Self::is_discontinuity(position_delta) {
            return Self::default();
        }

        Self {
            position_offset: position_delta,
            rotation_offset: rotation.inverse() * previous_rotation,
        }
    }

    pub fn decay(&mut self) {
        self.position_offset *= POSITION_DECAY;
        self.rotation_offset = self.rotation_offset.slerp(Quat::IDENTITY, ROTATION_DECAY);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&self, position: Vec3, rotation: Quat) -> (Vec3, Quat) {
        (
            position + self.position_offset,
            rotation * self.rotation_offset,
        )
    }
}

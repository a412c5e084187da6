use crate::net::UserInput;
use crate::physics::BodyDynamics;

use super::PlayerConfig;

/// Turns one tick of intents into camera-relative impulses on a body.
#[derive(Debug, Clone, Default)]
pub struct PlayerController {
    config: PlayerConfig,
}

impl PlayerController {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn can_jump<B: BodyDynamics + ?Sized>(&self, body: &B) -> bool {
        body.position().y <= self.config.jump_threshold
    }

    pub fn apply_input<B: BodyDynamics + ?Sized>(&self, body: &mut B, input: UserInput) {
        let basis = &self.config.camera;
        let force = self.config.move_force;
        let mode = self.config.force_mode;

        if input.forward() {
            body.apply_impulse(basis.forward * force, mode);
        }
        if input.backward() {
            body.apply_impulse(-basis.forward * force, mode);
        }
        if input.right() {
            body.apply_impulse(basis.right * force, mode);
        }
        if input.left() {
            body.apply_impulse(-basis.right * force, mode);
        }
        // Checked after the planar impulses; they never change the height.
        if input.jump() && self.can_jump(body) {
            body.apply_impulse(basis.up * force, mode);
        }
    }

    /// Applies `input` and advances the body by one fixed step.
    pub fn simulate<B: BodyDynamics + ?Sized>(&self, body: &mut B, input: UserInput, dt: f32) {
        self.apply_input(body, input);
        body.step(dt);
    }
}

use glam::{Quat, Vec3};

use super::{BodyDynamics, BodyState, ForceMode};

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Closed-form rigid sphere over an infinite ground plane at `y = 0`.
///
/// Semi-implicit Euler with no contact solver: bit-for-bit reproducible on any
/// platform, which makes it the reference backend for replay tests.
#[derive(Debug, Clone)]
pub struct PointMass {
    state: BodyState,
    mass: f32,
    radius: f32,
    ground_friction: f32,
}

impl PointMass {
    pub fn new(position: Vec3, radius: f32, mass: f32) -> Self {
        Self {
            state: BodyState::at(position),
            mass,
            radius,
            ground_friction: 0.1,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    fn grounded(&self) -> bool {
        self.state.position.y <= self.radius
    }
}

impl Default for PointMass {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.5, 0.0), 0.5, 1.0)
    }
}

impl BodyDynamics for PointMass {
    fn state(&self) -> BodyState {
        self.state
    }

    fn set_state(&mut self, state: &BodyState) {
        self.state = *state;
    }

    fn apply_impulse(&mut self, impulse: Vec3, mode: ForceMode) {
        self.state.linear_velocity += match mode {
            ForceMode::Impulse => impulse / self.mass,
            ForceMode::VelocityChange => impulse,
        };
    }

    fn step(&mut self, dt: f32) {
        let state = &mut self.state;
        state.linear_velocity += GRAVITY * dt;
        state.position += state.linear_velocity * dt;

        if state.position.y <= self.radius {
            state.position.y = self.radius;
            state.linear_velocity.y = state.linear_velocity.y.max(0.0);
        }

        if self.grounded() {
            let state = &mut self.state;
            let damping = (1.0 - self.ground_friction * dt).max(0.0);
            state.linear_velocity.x *= damping;
            state.linear_velocity.z *= damping;

            // Rolling without slipping about the contact point.
            let planar = Vec3::new(state.linear_velocity.x, 0.0, state.linear_velocity.z);
            state.angular_velocity = Vec3::Y.cross(planar) / self.radius;
        }

        let spin = self.state.angular_velocity * dt;
        if spin.length_squared() > 0.0 {
            let delta = Quat::from_scaled_axis(spin);
            self.state.rotation = (delta * self.state.rotation).normalize();
        }
    }
}

use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForceMode {
    /// Momentum change; scaled by the body's inverse mass.
    #[default]
    Impulse,
    /// Direct velocity change, independent of mass.
    VelocityChange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Default for BodyState {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

impl BodyState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

/// The physics capability the prediction core needs from an engine: read and
/// overwrite a single body, push it, and advance it by a fixed step.
///
/// Implementations must be deterministic: the same starting state and the same
/// impulses must produce bit-identical results, otherwise rewind-replay cannot
/// reproduce a prediction.
pub trait BodyDynamics {
    fn state(&self) -> BodyState;

    fn set_state(&mut self, state: &BodyState);

    fn apply_impulse(&mut self, impulse: Vec3, mode: ForceMode);

    fn step(&mut self, dt: f32);

    fn position(&self) -> Vec3 {
        self.state().position
    }

    fn rotation(&self) -> Quat {
        self.state().rotation
    }
}

impl<B: BodyDynamics + ?Sized> BodyDynamics for Box<B> {
    fn state(&self) -> BodyState {
        (**self).state()
    }

    fn set_state(&mut self, state: &BodyState) {
        (**self).set_state(state);
    }

    fn apply_impulse(&mut self, impulse: Vec3, mode: ForceMode) {
        (**self).apply_impulse(impulse, mode);
    }

    fn step(&mut self, dt: f32) {
        (**self).step(dt);
    }

    fn position(&self) -> Vec3 {
        (**self).position()
    }

    fn rotation(&self) -> Quat {
        (**self).rotation()
    }
}

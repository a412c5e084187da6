use std::fmt;

use glam::{Quat, Vec3};

use crate::error::SessionResult;
use crate::net::StateMessage;
use crate::physics::BodyDynamics;

use super::{ClientPredictor, SmoothingError};

pub const POSITION_TOLERANCE_SQUARED: f32 = 1e-7;
pub const ROTATION_TOLERANCE: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    pub error_correction: bool,
    pub correction_smoothing: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            error_correction: true,
            correction_smoothing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Error correction is switched off; only the ack was recorded.
    Skipped,
    /// The prediction for the tick was within tolerance.
    Matched,
    /// The body was rewound and `replayed` ticks were re-simulated.
    Corrected { replayed: u32, snapped: bool },
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reconciliation::Skipped => write!(f, "skipped"),
            Reconciliation::Matched => write!(f, "matched"),
            Reconciliation::Corrected {
                replayed,
                snapped: false,
            } => write!(f, "corrected ({replayed} ticks)"),
            Reconciliation::Corrected {
                replayed,
                snapped: true,
            } => write!(f, "snapped ({replayed} ticks)"),
        }
    }
}

/// Compares authoritative states against the prediction history and rewinds
/// the local body when they disagree.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
    smoothing: SmoothingError,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            smoothing: SmoothingError::default(),
        }
    }

    pub fn config(&self) -> ReconcilerConfig {
        self.config
    }

    pub fn set_error_correction(&mut self, enabled: bool) {
        self.config.error_correction = enabled;
    }

    pub fn set_correction_smoothing(&mut self, enabled: bool) {
        self.config.correction_smoothing = enabled;
    }

    pub fn smoothing(&self) -> &SmoothingError {
        &self.smoothing
    }

    pub fn rendered_transform<B: BodyDynamics + ?Sized>(&self, body: &B) -> (Vec3, Quat) {
        let state = body.state();
        self.smoothing.apply(state.position, state.rotation)
    }

    pub fn reconcile<B: BodyDynamics + ?Sized>(
        &mut self,
        message: &StateMessage,
        predictor: &mut ClientPredictor,
        body: &mut B,
    ) -> SessionResult<Reconciliation> {
        predictor.acknowledge(message.tick);

        let mut outcome = Reconciliation::Skipped;
        if self.config.error_correction {
            let predicted = predictor.predicted_state(message.tick)?;
            let position_error = message.position - predicted.position;
            let rotation_error = 1.0 - message.rotation.dot(predicted.rotation);

            outcome = if position_error.length_squared() > POSITION_TOLERANCE_SQUARED
                || rotation_error > ROTATION_TOLERANCE
            {
                log::debug!(
                    "Correct error at tick {} (rewinding {} ticks)",
                    message.tick,
                    predictor.current_tick() - message.tick
                );

                let (previous_position, previous_rotation) = self.rendered_transform(body);

                body.set_state(&message.body_state());
                let replayed = predictor.replay(message.tick, body)?;

                let live = body.state();
                let snapped =
                    SmoothingError::is_discontinuity(previous_position - live.position);
                self.smoothing = SmoothingError::after_correction(
                    previous_position,
                    previous_rotation,
                    live.position,
                    live.rotation,
                );

                Reconciliation::Corrected { replayed, snapped }
            } else {
                Reconciliation::Matched
            };
        }

        if self.config.correction_smoothing {
            self.smoothing.decay();
        } else {
            self.smoothing.reset();
        }

        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.smoothing.reset();
    }
}

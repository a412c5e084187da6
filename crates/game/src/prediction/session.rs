use glam::{Quat, Vec3};

use crate::error::SessionResult;
use crate::net::{DEFAULT_BUFFER_SIZE, DEFAULT_TICK_RATE, InputMessage, StateMessage, Tick, UserInput};
use crate::physics::BodyDynamics;
use crate::player::PlayerController;
use crate::simulation::FixedTimestep;

use super::{ClientPredictor, Reconciler, ReconcilerConfig, Reconciliation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionConfig {
    pub buffer_size: usize,
    pub tick_rate: u32,
    pub error_correction: bool,
    pub correction_smoothing: bool,
    pub redundant_input: bool,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            tick_rate: DEFAULT_TICK_RATE,
            error_correction: true,
            correction_smoothing: true,
            redundant_input: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    pub messages_built: u64,
    pub states_received: u64,
    pub corrections: u64,
    pub snaps: u64,
    pub replayed_ticks: u64,
}

/// One connection's worth of client-side prediction for the local player.
///
/// Dropping the session is the only way to discard its history; a resync
/// builds a new one from scratch.
pub struct ClientSession<B> {
    body: B,
    clock: FixedTimestep,
    predictor: ClientPredictor,
    reconciler: Reconciler,
    redundant_input: bool,
    stats: SessionStats,
}

impl<B: BodyDynamics> ClientSession<B> {
    pub fn new(body: B, controller: PlayerController, config: PredictionConfig) -> Self {
        let clock = FixedTimestep::new(config.tick_rate);
        let predictor = ClientPredictor::new(config.buffer_size, controller, clock.dt());
        let reconciler = Reconciler::new(ReconcilerConfig {
            error_correction: config.error_correction,
            correction_smoothing: config.correction_smoothing,
        });

        Self {
            body,
            clock,
            predictor,
            reconciler,
            redundant_input: config.redundant_input,
            stats: SessionStats::default(),
        }
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn into_body(self) -> B {
        self.body
    }

    pub fn current_tick(&self) -> Tick {
        self.predictor.current_tick()
    }

    pub fn latest_tick(&self) -> Tick {
        self.predictor.latest_tick()
    }

    pub fn predictor(&self) -> &ClientPredictor {
        &self.predictor
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn set_error_correction(&mut self, enabled: bool) {
        self.reconciler.set_error_correction(enabled);
    }

    pub fn set_correction_smoothing(&mut self, enabled: bool) {
        self.reconciler.set_correction_smoothing(enabled);
    }

    pub fn set_redundant_input(&mut self, enabled: bool) {
        self.redundant_input = enabled;
    }

    /// Advances the fixed clock by `delta` seconds and runs every tick that
    /// became due, sampling one input per tick. Returns the messages to send.
    pub fn update<F>(
        &mut self,
        delta: f32,
        connected: bool,
        mut sample: F,
    ) -> SessionResult<Vec<InputMessage>>
    where
        F: FnMut(Tick) -> UserInput,
    {
        let due = self.clock.advance(delta);
        let mut messages = Vec::new();
        for _ in 0..due {
            let input = sample(self.predictor.current_tick());
            if let Some(message) = self.tick(input, connected)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    /// Runs exactly one prediction tick with `input`.
    pub fn tick(&mut self, input: UserInput, connected: bool) -> SessionResult<Option<InputMessage>> {
        let recorded = self.predictor.advance(&mut self.body, input);
        self.stats.ticks += 1;
        log::trace!("tick={} input=({})", recorded, input);

        if !connected {
            return Ok(None);
        }

        let message = self.predictor.input_message(self.redundant_input)?;
        self.stats.messages_built += 1;
        Ok(Some(message))
    }

    pub fn handle_state(&mut self, message: &StateMessage) -> SessionResult<Reconciliation> {
        self.stats.states_received += 1;
        let outcome = self
            .reconciler
            .reconcile(message, &mut self.predictor, &mut self.body)?;

        if let Reconciliation::Corrected { replayed, snapped } = outcome {
            self.stats.corrections += 1;
            self.stats.replayed_ticks += u64::from(replayed);
            if snapped {
                self.stats.snaps += 1;
            }
        }
        Ok(outcome)
    }

    /// Transform to draw this frame: live body plus the decaying visual offset.
    pub fn rendered_transform(&self) -> (Vec3, Quat) {
        self.reconciler.rendered_transform(&self.body)
    }
}

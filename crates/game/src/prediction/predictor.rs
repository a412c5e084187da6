use glam::{Quat, Vec3};

use crate::net::{InputMessage, Tick, UserInput};
use crate::physics::BodyDynamics;
use crate::player::PlayerController;
use crate::simulation::{BufferError, TickBuffer};

/// The locally simulated transform a tick started from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedState {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for PredictedState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl PredictedState {
    pub fn of<B: BodyDynamics + ?Sized>(body: &B) -> Self {
        let state = body.state();
        Self {
            position: state.position,
            rotation: state.rotation,
        }
    }
}

/// Per-tick input and state history of the local player.
///
/// Slot `t` of the state buffer holds the state the body had *before* the
/// input of tick `t` was applied.
pub struct ClientPredictor {
    inputs: TickBuffer<UserInput>,
    states: TickBuffer<PredictedState>,
    controller: PlayerController,
    current_tick: Tick,
    latest_tick: Tick,
    dt: f32,
}

impl ClientPredictor {
    pub fn new(capacity: usize, controller: PlayerController, dt: f32) -> Self {
        Self {
            inputs: TickBuffer::new(capacity),
            states: TickBuffer::new(capacity),
            controller,
            current_tick: 0,
            latest_tick: 0,
            dt,
        }
    }

    /// The next tick to be recorded.
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Tick of the most recently received server state.
    pub fn latest_tick(&self) -> Tick {
        self.latest_tick
    }

    pub fn capacity(&self) -> usize {
        self.inputs.capacity()
    }

    pub fn controller(&self) -> &PlayerController {
        &self.controller
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Records `input` and the body's pre-input state for the current tick,
    /// simulates one step and returns the tick that was recorded.
    pub fn advance<B: BodyDynamics + ?Sized>(&mut self, body: &mut B, input: UserInput) -> Tick {
        let tick = self.current_tick;
        self.inputs.insert(tick, input);
        self.states.insert(tick, PredictedState::of(body));

        self.controller.simulate(body, input, self.dt);
        self.current_tick += 1;
        tick
    }

    /// Input message covering every recorded tick from `start` through the
    /// newest one.
    pub fn input_message_from(&self, start: Tick) -> Result<InputMessage, BufferError> {
        let Some(newest) = self.current_tick.checked_sub(1) else {
            return Ok(InputMessage::new(self.current_tick, Vec::new()));
        };
        let start = start.min(newest);
        let inputs = self.inputs.range(start, newest, self.current_tick)?;
        Ok(InputMessage::new(start, inputs))
    }

    /// Builds the message to send after [`advance`](Self::advance): the newest
    /// input alone, or everything since the last acknowledged tick when
    /// `redundant` is set.
    pub fn input_message(&self, redundant: bool) -> Result<InputMessage, BufferError> {
        let newest = self.current_tick.saturating_sub(1);
        let start = if redundant { self.latest_tick } else { newest };
        self.input_message_from(start)
    }

    pub fn acknowledge(&mut self, tick: Tick) {
        self.latest_tick = tick;
    }

    pub fn predicted_state(&self, tick: Tick) -> Result<PredictedState, BufferError> {
        self.states.get(tick, self.current_tick).copied()
    }

    pub fn recorded_input(&self, tick: Tick) -> Result<UserInput, BufferError> {
        self.inputs.get(tick, self.current_tick).copied()
    }

    /// Re-simulates every recorded tick from `from` up to the current tick,
    /// starting from whatever state `body` holds, and overwrites the state
    /// history along the way. Returns the number of replayed ticks.
    pub fn replay<B: BodyDynamics + ?Sized>(
        &mut self,
        from: Tick,
        body: &mut B,
    ) -> Result<u32, BufferError> {
        self.inputs.check_window(from, self.current_tick)?;

        for tick in from..self.current_tick {
            let input = self.recorded_input(tick)?;
            self.states.insert(tick, PredictedState::of(body));
            self.controller.simulate(body, input, self.dt);
        }
        Ok(self.current_tick - from)
    }

    pub fn reset(&mut self) {
        self.inputs.clear();
        self.states.clear();
        self.current_tick = 0;
        self.latest_tick = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BodyState, PointMass};

    const DT: f32 = 0.02;

    fn predictor(capacity: usize) -> ClientPredictor {
        ClientPredictor::new(capacity, PlayerController::default(), DT)
    }

    #[test]
    fn records_pre_input_state() {
        let mut predictor = predictor(16);
        let mut body = PointMass::default();
        let before = PredictedState::of(&body);

        let tick = predictor.advance(&mut body, UserInput::FORWARD);
        assert_eq!(tick, 0);
        assert_eq!(predictor.current_tick(), 1);
        assert_eq!(predictor.predicted_state(0), Ok(before));
        assert_eq!(predictor.recorded_input(0), Ok(UserInput::FORWARD));
        assert!(body.position().z > 0.0);
    }

    #[test]
    fn single_input_message_covers_newest_tick() {
        let mut predictor = predictor(16);
        let mut body = PointMass::default();
        for _ in 0..5 {
            predictor.advance(&mut body, UserInput::RIGHT);
        }

        let message = predictor.input_message(false).unwrap();
        assert_eq!(message.start_tick, 4);
        assert_eq!(message.inputs, vec![UserInput::RIGHT]);
    }

    #[test]
    fn redundant_message_starts_at_ack() {
        let mut predictor = predictor(16);
        let mut body = PointMass::default();
        let inputs = [
            UserInput::FORWARD,
            UserInput::LEFT,
            UserInput::JUMP,
            UserInput::empty(),
            UserInput::BACKWARD,
        ];
        for input in inputs {
            predictor.advance(&mut body, input);
        }
        predictor.acknowledge(2);

        let message = predictor.input_message(true).unwrap();
        assert_eq!(message.start_tick, 2);
        assert_eq!(message.inputs, inputs[2..].to_vec());
        assert_eq!(message.max_tick(), Some(4));
    }

    #[test]
    fn redundant_message_overrun_is_reported() {
        let mut predictor = predictor(8);
        let mut body = PointMass::default();
        for _ in 0..20 {
            predictor.advance(&mut body, UserInput::empty());
        }

        assert!(matches!(
            predictor.input_message(true),
            Err(BufferError::Overrun { tick: 0, .. })
        ));
        predictor.acknowledge(15);
        assert!(predictor.input_message(true).is_ok());
    }

    #[test]
    fn replay_rewrites_history_from_tick() {
        let mut predictor = predictor(32);
        let mut body = PointMass::default();
        let inputs = [UserInput::FORWARD, UserInput::JUMP, UserInput::LEFT, UserInput::RIGHT];
        for input in inputs.iter().cycle().take(12) {
            predictor.advance(&mut body, *input);
        }
        let start = predictor.predicted_state(4).unwrap();

        let mut replayed = PointMass::default();
        let mut state = BodyState::at(start.position);
        state.rotation = start.rotation;
        replayed.set_state(&state);
        assert_eq!(predictor.replay(4, &mut replayed), Ok(8));
        assert_eq!(predictor.predicted_state(4), Ok(start));
        assert_eq!(predictor.current_tick(), 12);
    }

    #[test]
    fn reset_starts_over() {
        let mut predictor = predictor(8);
        let mut body = PointMass::default();
        predictor.advance(&mut body, UserInput::FORWARD);
        predictor.acknowledge(0);
        predictor.reset();

        assert_eq!(predictor.current_tick(), 0);
        assert_eq!(predictor.latest_tick(), 0);
        assert!(predictor.predicted_state(0).is_err());
    }
}

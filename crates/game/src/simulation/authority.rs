use crate::error::{SessionError, SessionResult};
use crate::net::{InputMessage, StateMessage, Tick};
use crate::physics::BodyDynamics;
use crate::player::PlayerController;

/// Authoritative simulation for one player slot.
///
/// Inputs are applied strictly in tick order and each tick is simulated exactly
/// once, so overlapping or duplicated input messages are harmless.
pub struct ServerSimulator<B> {
    body: B,
    controller: PlayerController,
    current_tick: Tick,
    dt: f32,
}

impl<B: BodyDynamics> ServerSimulator<B> {
    pub fn new(body: B, controller: PlayerController, dt: f32) -> Self {
        Self {
            body,
            controller,
            current_tick: 0,
            dt,
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    /// Simulates the ticks of `message` not yet covered and returns one state per
    /// simulated tick, tagged with the tick it was simulated at.
    pub fn apply(&mut self, message: &InputMessage) -> SessionResult<Vec<StateMessage>> {
        let max_tick = message.max_tick();
        if max_tick.is_none_or(|max| max < self.current_tick) {
            return Err(SessionError::StaleMessage {
                max_tick,
                current_tick: self.current_tick,
            });
        }

        if message.start_tick > self.current_tick {
            log::debug!(
                "Input gap: message starts at {} while server is at {}",
                message.start_tick,
                self.current_tick
            );
        }

        let offset = self.current_tick.saturating_sub(message.start_tick) as usize;
        let mut states = Vec::with_capacity(message.inputs.len() - offset);

        for &input in &message.inputs[offset..] {
            self.controller.simulate(&mut self.body, input, self.dt);

            let state = StateMessage::from_body(self.current_tick, &self.body.state());
            log::trace!("stateMessage={}", state);
            states.push(state);

            self.current_tick += 1;
        }

        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::UserInput;
    use crate::physics::PointMass;

    const DT: f32 = 0.02;

    fn simulator_at(tick: Tick) -> ServerSimulator<PointMass> {
        let mut sim = ServerSimulator::new(PointMass::default(), PlayerController::default(), DT);
        let warmup = InputMessage::new(0, vec![UserInput::empty(); tick as usize]);
        if tick > 0 {
            sim.apply(&warmup).unwrap();
        }
        assert_eq!(sim.current_tick(), tick);
        sim
    }

    #[test]
    fn overlapping_message_only_simulates_new_ticks() {
        let mut sim = simulator_at(12);
        let c = UserInput::FORWARD | UserInput::JUMP;
        let message = InputMessage::new(10, vec![UserInput::LEFT, UserInput::RIGHT, c]);

        let mut reference = simulator_at(12);
        reference.controller.simulate(&mut reference.body, c, DT);

        let states = sim.apply(&message).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].tick, 12);
        assert_eq!(sim.current_tick(), 13);
        assert_eq!(states[0].body_state(), reference.body().state());
    }

    #[test]
    fn stale_message_is_dropped() {
        let mut sim = simulator_at(8);
        let before = sim.body().state();
        let message = InputMessage::new(3, vec![UserInput::FORWARD; 3]);

        let result = sim.apply(&message);
        assert!(matches!(
            result,
            Err(SessionError::StaleMessage {
                max_tick: Some(5),
                current_tick: 8
            })
        ));
        assert_eq!(sim.current_tick(), 8);
        assert_eq!(sim.body().state(), before);
    }

    #[test]
    fn empty_message_is_stale() {
        let mut sim = simulator_at(0);
        assert!(sim.apply(&InputMessage::new(0, Vec::new())).is_err());
        assert_eq!(sim.current_tick(), 0);
    }

    #[test]
    fn duplicates_do_not_resimulate() {
        let mut sim = simulator_at(0);
        let message = InputMessage::new(0, vec![UserInput::FORWARD; 4]);

        assert_eq!(sim.apply(&message).unwrap().len(), 4);
        let after_first = sim.body().state();

        assert!(sim.apply(&message).is_err());
        assert_eq!(sim.current_tick(), 4);
        assert_eq!(sim.body().state(), after_first);
    }

    #[test]
    fn redundant_stream_tick_is_strictly_monotonic() {
        let mut sim = simulator_at(0);
        let mut seen = Vec::new();

        // Each message resends from an ack that lags two ticks behind.
        for newest in 0..30u32 {
            let start = newest.saturating_sub(2);
            let inputs = vec![UserInput::RIGHT; (newest - start + 1) as usize];
            if let Ok(states) = sim.apply(&InputMessage::new(start, inputs)) {
                seen.extend(states.iter().map(|s| s.tick));
            }
        }

        assert_eq!(seen, (0..30).collect::<Vec<_>>());
        assert_eq!(sim.current_tick(), 30);
    }

    #[test]
    fn gap_is_simulated_from_current_tick() {
        let mut sim = simulator_at(5);
        let states = sim
            .apply(&InputMessage::new(9, vec![UserInput::empty(); 2]))
            .unwrap();
        let ticks: Vec<Tick> = states.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![5, 6]);
    }
}

/// Turns variable frame time into whole fixed-duration ticks.
///
/// Elapsed time is never clamped: after a long stall every owed tick is run in
/// the next update.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.max(0.0);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    /// Accumulates `delta` and returns how many ticks are now due, consuming them.
    pub fn advance(&mut self, delta: f32) -> u32 {
        self.accumulate(delta);
        let mut ticks = 0;
        while self.consume_tick() {
            ticks += 1;
        }
        ticks
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(50);

        ts.accumulate(1.0 / 25.0);
        assert!(ts.should_tick());
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
    }

    #[test]
    fn partial_ticks_carry_over() {
        let mut ts = FixedTimestep::new(50);

        assert_eq!(ts.advance(0.015), 0);
        assert_eq!(ts.advance(0.015), 1);
        assert!((ts.alpha() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn long_stall_catches_up_without_clamping() {
        let mut ts = FixedTimestep::new(50);
        assert_eq!(ts.advance(1.001), 50);
        assert!(!ts.should_tick());
    }

    #[test]
    fn negative_delta_is_ignored() {
        let mut ts = FixedTimestep::new(50);
        ts.accumulate(-1.0);
        assert_eq!(ts.alpha(), 0.0);
    }
}

use std::fmt;
use std::str::FromStr;

use reckon::UserInput;
use reckon::net::rand_u64;

/// Stands in for a keyboard: produces one input per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputScript {
    Idle,
    /// Forward, right, backward, left; one second each, hopping at every turn.
    #[default]
    Square,
    Zigzag,
    Random,
}

impl InputScript {
    pub fn sample(self, tick: u32) -> UserInput {
        match self {
            InputScript::Idle => UserInput::empty(),
            InputScript::Square => {
                let leg = match (tick / 50) % 4 {
                    0 => UserInput::FORWARD,
                    1 => UserInput::RIGHT,
                    2 => UserInput::BACKWARD,
                    _ => UserInput::LEFT,
                };
                if tick % 50 == 0 {
                    leg | UserInput::JUMP
                } else {
                    leg
                }
            }
            InputScript::Zigzag => {
                let side = if (tick / 10) % 2 == 0 {
                    UserInput::LEFT
                } else {
                    UserInput::RIGHT
                };
                UserInput::FORWARD | side
            }
            InputScript::Random => UserInput::from_bits_truncate(rand_u64() as u8),
        }
    }
}

impl FromStr for InputScript {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idle" => Ok(InputScript::Idle),
            "square" => Ok(InputScript::Square),
            "zigzag" => Ok(InputScript::Zigzag),
            "random" => Ok(InputScript::Random),
            other => Err(format!("unknown input script '{other}'")),
        }
    }
}

impl fmt::Display for InputScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputScript::Idle => "idle",
            InputScript::Square => "square",
            InputScript::Zigzag => "zigzag",
            InputScript::Random => "random",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_walks_four_legs() {
        let script = InputScript::Square;
        assert_eq!(script.sample(0), UserInput::FORWARD | UserInput::JUMP);
        assert_eq!(script.sample(1), UserInput::FORWARD);
        assert_eq!(script.sample(60), UserInput::RIGHT);
        assert_eq!(script.sample(120), UserInput::BACKWARD);
        assert_eq!(script.sample(199), UserInput::LEFT);
        assert_eq!(script.sample(200), UserInput::FORWARD | UserInput::JUMP);
    }

    #[test]
    fn zigzag_always_moves_forward() {
        for tick in 0..100 {
            assert!(InputScript::Zigzag.sample(tick).forward());
        }
        assert!(InputScript::Zigzag.sample(5).left());
        assert!(InputScript::Zigzag.sample(15).right());
    }

    #[test]
    fn random_stays_in_known_bits() {
        for tick in 0..100 {
            assert!(UserInput::all().contains(InputScript::Random.sample(tick)));
        }
    }

    #[test]
    fn parse_round_trip() {
        for script in [
            InputScript::Idle,
            InputScript::Square,
            InputScript::Zigzag,
            InputScript::Random,
        ] {
            assert_eq!(script.to_string().parse(), Ok(script));
        }
    }
}

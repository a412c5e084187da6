use std::fmt;

use bitflags::bitflags;
use glam::{Quat, Vec3};

use crate::physics::BodyState;

pub const MAX_PACKET_SIZE: usize = 65_507;
pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_TICK_RATE: u32 = 50;
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Upper bound on inputs carried by one message; a redundant resend can never
/// cover more ticks than the client still has buffered.
pub const MAX_INPUTS_PER_MESSAGE: usize = DEFAULT_BUFFER_SIZE;

pub const USER_INPUT_SIZE: usize = 5 * 4;
pub const INPUT_HEADER_SIZE: usize = 2 * 4;
pub const STATE_MESSAGE_SIZE: usize = 4 + 13 * 4;

pub type Tick = u32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unexpected end of message: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
    #[error("negative tick {0}")]
    NegativeTick(i32),
    #[error("tick {0} does not fit the signed 32-bit wire field")]
    TickOutOfRange(Tick),
    #[error("invalid input count {count} (max {max})")]
    InvalidCount { count: i32, max: usize },
    #[error("invalid boolean value {0}")]
    InvalidBool(i32),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UserInput: u8 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const RIGHT = 1 << 2;
        const LEFT = 1 << 3;
        const JUMP = 1 << 4;
    }
}

impl Default for UserInput {
    fn default() -> Self {
        Self::empty()
    }
}

impl UserInput {
    // Wire order of the five flags.
    const FIELDS: [UserInput; 5] = [
        UserInput::FORWARD,
        UserInput::BACKWARD,
        UserInput::RIGHT,
        UserInput::LEFT,
        UserInput::JUMP,
    ];

    pub fn forward(self) -> bool {
        self.contains(Self::FORWARD)
    }

    pub fn backward(self) -> bool {
        self.contains(Self::BACKWARD)
    }

    pub fn right(self) -> bool {
        self.contains(Self::RIGHT)
    }

    pub fn left(self) -> bool {
        self.contains(Self::LEFT)
    }

    pub fn jump(self) -> bool {
        self.contains(Self::JUMP)
    }

    fn encode(self, writer: &mut WireWriter) {
        for flag in Self::FIELDS {
            writer.write_i32(i32::from(self.contains(flag)));
        }
    }

    fn decode(reader: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let mut input = UserInput::empty();
        for flag in Self::FIELDS {
            match reader.read_i32()? {
                0 => {}
                1 => input.insert(flag),
                other => return Err(ProtocolError::InvalidBool(other)),
            }
        }
        Ok(input)
    }
}

impl fmt::Display for UserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "up={}, down={}, right={}, left={}, jump={}",
            self.forward(),
            self.backward(),
            self.right(),
            self.left(),
            self.jump()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputMessage {
    pub start_tick: Tick,
    pub inputs: Vec<UserInput>,
}

impl InputMessage {
    pub fn new(start_tick: Tick, inputs: Vec<UserInput>) -> Self {
        Self { start_tick, inputs }
    }

    /// Last tick covered by this message, or `None` when it carries no inputs.
    pub fn max_tick(&self) -> Option<Tick> {
        let count = Tick::try_from(self.inputs.len()).ok()?;
        self.start_tick.checked_add(count)?.checked_sub(1)
    }

    pub fn encoded_len(&self) -> usize {
        INPUT_HEADER_SIZE + self.inputs.len() * USER_INPUT_SIZE
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.inputs.len();
        if len > MAX_INPUTS_PER_MESSAGE {
            return Err(ProtocolError::InvalidCount {
                count: i32::try_from(len).unwrap_or(i32::MAX),
                max: MAX_INPUTS_PER_MESSAGE,
            });
        }

        let mut writer = WireWriter::with_capacity(self.encoded_len());
        writer.write_tick(self.start_tick)?;
        writer.write_i32(len as i32);
        for input in &self.inputs {
            input.encode(&mut writer);
        }
        Ok(writer.into_bytes())
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = WireReader::new(data);
        let start_tick = reader.read_tick()?;

        let count = reader.read_i32()?;
        let len = usize::try_from(count)
            .ok()
            .filter(|&len| len <= MAX_INPUTS_PER_MESSAGE)
            .ok_or(ProtocolError::InvalidCount {
                count,
                max: MAX_INPUTS_PER_MESSAGE,
            })?;

        let mut inputs = Vec::with_capacity(len);
        for _ in 0..len {
            inputs.push(UserInput::decode(&mut reader)?);
        }

        reader.finish()?;
        Ok(Self { start_tick, inputs })
    }
}

impl fmt::Display for InputMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "startTick={}, inputCount={}, inputs=(",
            self.start_tick,
            self.inputs.len()
        )?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                f.write_str("),(")?;
            }
            write!(f, "{input}")?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateMessage {
    pub tick: Tick,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl StateMessage {
    pub fn from_body(tick: Tick, state: &BodyState) -> Self {
        Self {
            tick,
            position: state.position,
            rotation: state.rotation,
            velocity: state.linear_velocity,
            angular_velocity: state.angular_velocity,
        }
    }

    pub fn body_state(&self) -> BodyState {
        BodyState {
            position: self.position,
            rotation: self.rotation,
            linear_velocity: self.velocity,
            angular_velocity: self.angular_velocity,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut writer = WireWriter::with_capacity(STATE_MESSAGE_SIZE);
        writer.write_tick(self.tick)?;
        writer.write_vec3(self.position);
        writer.write_f32(self.rotation.x);
        writer.write_f32(self.rotation.y);
        writer.write_f32(self.rotation.z);
        writer.write_f32(self.rotation.w);
        writer.write_vec3(self.velocity);
        writer.write_vec3(self.angular_velocity);
        Ok(writer.into_bytes())
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = WireReader::new(data);
        let message = Self {
            tick: reader.read_tick()?,
            position: reader.read_vec3()?,
            rotation: Quat::from_xyzw(
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ),
            velocity: reader.read_vec3()?,
            angular_velocity: reader.read_vec3()?,
        };
        reader.finish()?;
        Ok(message)
    }
}

impl fmt::Display for StateMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick={}, position={}, rotation={}, velocity={}, angularVelocity={}",
            self.tick, self.position, self.rotation, self.velocity, self.angular_velocity
        )
    }
}

struct WireWriter {
    bytes: Vec<u8>,
}

impl WireWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn write_tick(&mut self, tick: Tick) -> Result<(), ProtocolError> {
        let raw = i32::try_from(tick).map_err(|_| ProtocolError::TickOutOfRange(tick))?;
        self.write_i32(raw);
        Ok(())
    }

    fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn write_vec3(&mut self, value: Vec3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let available = self.data.len() - self.pos;
        if available < N {
            return Err(ProtocolError::Truncated {
                needed: N,
                available,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.read_bytes::<4>().map(i32::from_le_bytes)
    }

    fn read_tick(&mut self) -> Result<Tick, ProtocolError> {
        let raw = self.read_i32()?;
        Tick::try_from(raw).map_err(|_| ProtocolError::NegativeTick(raw))
    }

    fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.read_bytes::<4>().map(f32::from_le_bytes)
    }

    fn read_vec3(&mut self) -> Result<Vec3, ProtocolError> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    fn finish(self) -> Result<(), ProtocolError> {
        match self.data.len() - self.pos {
            0 => Ok(()),
            trailing => Err(ProtocolError::TrailingBytes(trailing)),
        }
    }
}

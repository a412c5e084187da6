mod connection;
mod endpoint;
mod frame;
mod protocol;
mod simulator;
mod stats;

pub use connection::{
    ConnectionManager, ConnectionState, DEFAULT_TIMEOUT_SECS, PeerConnection, ServerFull,
};
pub use endpoint::{NetworkEndpoint, NetworkEvent};
pub use frame::{Frame, FrameError, SessionId};
pub use protocol::{
    DEFAULT_BUFFER_SIZE, DEFAULT_PORT, DEFAULT_TICK_RATE, INPUT_HEADER_SIZE, InputMessage,
    MAX_INPUTS_PER_MESSAGE, MAX_PACKET_SIZE, ProtocolError, STATE_MESSAGE_SIZE, StateMessage,
    Tick, USER_INPUT_SIZE, UserInput,
};
pub use simulator::{Fate, NetworkSimulator};
pub use stats::{NetworkStats, PacketLossSimulation, rand_percent, rand_u64};

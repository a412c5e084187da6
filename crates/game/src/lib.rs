pub mod error;
pub mod net;
pub mod physics;
pub mod player;
pub mod prediction;
pub mod simulation;

pub use error::{Recovery, SessionError, SessionResult};
pub use net::{
    ConnectionManager, ConnectionState, DEFAULT_BUFFER_SIZE, DEFAULT_PORT, DEFAULT_TICK_RATE,
    DEFAULT_TIMEOUT_SECS, Frame, InputMessage, NetworkEndpoint, NetworkEvent, NetworkStats,
    PacketLossSimulation, ProtocolError, SessionId, StateMessage, Tick, UserInput,
};
pub use physics::{
    BodyDynamics, BodyState, ForceMode, PhysicsBackend, PhysicsScene, PointMass,
};
pub use player::{CameraBasis, PlayerConfig, PlayerController};
pub use prediction::{
    ClientPredictor, ClientSession, PredictedState, PredictionConfig, Reconciler,
    ReconcilerConfig, Reconciliation, SessionStats, SmoothingError,
};
pub use simulation::{BufferError, FixedTimestep, ServerSimulator, TickBuffer};

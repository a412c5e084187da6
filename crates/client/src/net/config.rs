use std::net::SocketAddr;
use std::time::Duration;

use reckon::{
    DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, PacketLossSimulation, PhysicsBackend, PlayerConfig,
    PredictionConfig,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    pub prediction: PredictionConfig,
    pub player: PlayerConfig,
    pub backend: PhysicsBackend,
    pub connect_timeout: Duration,
    pub connection_timeout_secs: u64,
    pub reconnect_attempts: u32,
    pub packet_loss: Option<PacketLossSimulation>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            prediction: PredictionConfig::default(),
            player: PlayerConfig::default(),
            backend: PhysicsBackend::default(),
            connect_timeout: Duration::from_secs(2),
            connection_timeout_secs: DEFAULT_TIMEOUT_SECS,
            reconnect_attempts: 5,
            packet_loss: None,
        }
    }
}

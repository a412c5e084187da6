use reckon::{DEFAULT_TICK_RATE, DEFAULT_TIMEOUT_SECS, PacketLossSimulation, PhysicsBackend, PlayerConfig};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub max_clients: usize,
    pub timeout_secs: u64,
    pub backend: PhysicsBackend,
    pub player: PlayerConfig,
    pub packet_loss: Option<PacketLossSimulation>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_clients: 32,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backend: PhysicsBackend::default(),
            player: PlayerConfig::default(),
            packet_loss: None,
        }
    }
}

impl ServerConfig {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

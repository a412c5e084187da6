use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reckon::{
    BodyDynamics, ConnectionManager, Frame, InputMessage, NetworkEndpoint, NetworkEvent,
    NetworkStats, PlayerController, Recovery, ServerSimulator, SessionId,
};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};

type PlayerSimulator = ServerSimulator<Box<dyn BodyDynamics>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerStats {
    pub inputs_received: u64,
    pub states_sent: u64,
    pub stale_dropped: u64,
    pub malformed_dropped: u64,
    /// Inputs tagged with a session other than the address's live one.
    pub foreign_session_dropped: u64,
}

/// The live session of one client address.
struct PlayerSlot {
    session: SessionId,
    simulator: PlayerSimulator,
}

/// Authoritative server: one independent simulation per connected address.
///
/// A slot is only replaced when its client asks for a new session id. Repeated
/// connect requests for the live session are answered again and leave the
/// simulation alone; requests for an ended session are ignored.
pub struct GameServer {
    endpoint: NetworkEndpoint,
    connections: ConnectionManager,
    slots: HashMap<SocketAddr, PlayerSlot>,
    ended_sessions: HashMap<SocketAddr, Vec<(SessionId, Instant)>>,
    config: ServerConfig,
    stats: ServerStats,
    running: Arc<AtomicBool>,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let mut endpoint = NetworkEndpoint::bind(bind_addr)?;
        if let Some(sim) = &config.packet_loss {
            endpoint.set_loss_simulation(sim.clone());
        }

        Ok(Self {
            endpoint,
            connections: ConnectionManager::with_timeout(config.max_clients, config.timeout_secs),
            slots: HashMap::new(),
            ended_sessions: HashMap::new(),
            stats: ServerStats::default(),
            running: Arc::new(AtomicBool::new(true)),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    pub fn network_stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    pub fn client_count(&self) -> usize {
        self.connections.connected_count()
    }

    #[cfg(test)]
    pub fn simulator_tick(&self, addr: &SocketAddr) -> Option<reckon::Tick> {
        self.slots.get(addr).map(|slot| slot.simulator.current_tick())
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.poll_once();
            let events: Vec<ServerEvent> = self.drain_events().collect();
            for event in events {
                match event {
                    ServerEvent::Error { .. } => log::error!("{}", event),
                    ServerEvent::ConnectionDenied { .. } => log::warn!("{}", event),
                    _ => log::info!("{} ({} connected)", event, self.client_count()),
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown_connections();
    }

    /// Handles everything that arrived since the last call. Simulation is
    /// driven entirely by incoming input messages.
    pub fn poll_once(&mut self) {
        match self.endpoint.receive() {
            Ok(events) => {
                for event in events {
                    self.handle_event(event);
                }
            }
            Err(e) => self.pending_events.push_back(ServerEvent::Error {
                message: format!("Network error: {}", e),
            }),
        }

        for addr in self.connections.cleanup_timed_out() {
            self.end_slot(addr);
            self.pending_events.push_back(ServerEvent::ClientDisconnected {
                addr,
                reason: DisconnectReason::Timeout,
            });
        }

        // Datagrams older than the connection timeout are not worth guarding against.
        let window = Duration::from_secs(self.config.timeout_secs);
        self.ended_sessions.retain(|_, ended| {
            ended.retain(|(_, at)| at.elapsed() < window);
            !ended.is_empty()
        });
    }

    pub fn shutdown_connections(&mut self) {
        let addrs: Vec<SocketAddr> = self.connections.iter().map(|peer| peer.addr).collect();
        for addr in addrs {
            self.send(&Frame::Disconnect, addr);
            self.drop_client(addr, DisconnectReason::Shutdown);
        }
    }

    fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Connected(addr, session) => self.handle_connect(addr, session),
            NetworkEvent::Data(addr, session, payload) => {
                self.handle_input(addr, session, &payload)
            }
            NetworkEvent::Disconnected(addr) => {
                self.drop_client(addr, DisconnectReason::Graceful);
            }
            NetworkEvent::Accepted(addr, _) => {
                log::debug!("Ignoring accept frame from {}", addr);
            }
        }
    }

    fn handle_connect(&mut self, addr: SocketAddr, session: SessionId) {
        if self.slots.get(&addr).is_some_and(|slot| slot.session == session) {
            self.connections.touch(&addr);
            self.send(&Frame::Accept(session), addr);
            return;
        }

        let ended = self
            .ended_sessions
            .get(&addr)
            .is_some_and(|ended| ended.iter().any(|&(id, _)| id == session));
        if ended {
            log::debug!("Ignoring connect from {} for ended session {:08x}", addr, session);
            return;
        }

        match self.connections.accept(addr) {
            Ok(resumed) => {
                self.end_slot(addr);
                let body = self.config.backend.create(self.config.player.spawn_position);
                let controller = PlayerController::new(self.config.player.clone());
                let simulator = ServerSimulator::new(body, controller, self.config.dt());
                self.slots.insert(addr, PlayerSlot { session, simulator });

                self.send(&Frame::Accept(session), addr);
                self.pending_events
                    .push_back(ServerEvent::ClientConnected { addr, resumed });
            }
            Err(full) => {
                self.send(&Frame::Disconnect, addr);
                self.pending_events.push_back(ServerEvent::ConnectionDenied {
                    addr,
                    reason: full.to_string(),
                });
            }
        }
    }

    fn handle_input(&mut self, addr: SocketAddr, session: SessionId, payload: &[u8]) {
        let Some(slot) = self.slots.get_mut(&addr) else {
            log::debug!("Data from unknown peer {}", addr);
            return;
        };
        if slot.session != session {
            self.stats.foreign_session_dropped += 1;
            log::debug!("Dropping input from {} for session {:08x}", addr, session);
            return;
        }

        let message = match InputMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                self.stats.malformed_dropped += 1;
                log::warn!("Malformed input message from {}: {}", addr, e);
                return;
            }
        };
        self.stats.inputs_received += 1;
        log::trace!("inputMessage={}", message);

        let result = slot.simulator.apply(&message);
        self.connections.touch(&addr);
        let states = match result {
            Ok(states) => states,
            Err(e) => {
                match e.recovery() {
                    Recovery::Ignore => {
                        self.stats.stale_dropped += 1;
                        log::debug!("Dropping input from {}: {}", addr, e);
                    }
                    _ => log::warn!("Input from {} rejected: {}", addr, e),
                }
                return;
            }
        };

        for state in states {
            match state.encode() {
                Ok(bytes) => {
                    self.send(&Frame::Data(session, bytes), addr);
                    self.stats.states_sent += 1;
                }
                Err(e) => log::warn!("State for {} not sent: {}", addr, e),
            }
        }
    }

    /// Forgets the simulation for `addr`, remembering its session as ended.
    fn end_slot(&mut self, addr: SocketAddr) {
        if let Some(slot) = self.slots.remove(&addr) {
            self.ended_sessions
                .entry(addr)
                .or_default()
                .push((slot.session, Instant::now()));
        }
    }

    fn drop_client(&mut self, addr: SocketAddr, reason: DisconnectReason) {
        self.end_slot(addr);
        if self.connections.remove(&addr).is_some() {
            self.pending_events
                .push_back(ServerEvent::ClientDisconnected { addr, reason });
        }
    }

    fn send(&mut self, frame: &Frame, addr: SocketAddr) {
        if let Err(e) = self.endpoint.send_to(frame, addr) {
            self.pending_events.push_back(ServerEvent::Error {
                message: format!("Send to {} failed: {}", addr, e),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use reckon::{PhysicsBackend, StateMessage, Tick, UserInput};

    use super::*;

    fn test_server() -> GameServer {
        let config = ServerConfig {
            backend: PhysicsBackend::PointMass,
            ..Default::default()
        };
        GameServer::new("127.0.0.1:0", config).unwrap()
    }

    fn pump(server: &mut GameServer, client: &mut NetworkEndpoint) -> Vec<NetworkEvent> {
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(500) {
            server.poll_once();
            let events = client.receive().unwrap();
            if !events.is_empty() {
                return events;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Vec::new()
    }

    fn send_inputs(
        client: &mut NetworkEndpoint,
        server_addr: SocketAddr,
        session: SessionId,
        message: &InputMessage,
    ) {
        client
            .send_to(&Frame::Data(session, message.encode().unwrap()), server_addr)
            .unwrap();
    }

    /// Collects state ticks until `count` have arrived.
    fn state_ticks(
        server: &mut GameServer,
        client: &mut NetworkEndpoint,
        session: SessionId,
        count: usize,
    ) -> Vec<Tick> {
        let mut ticks = Vec::new();
        while ticks.len() < count {
            let events = pump(server, client);
            assert!(!events.is_empty(), "states never arrived");
            for event in events {
                if let NetworkEvent::Data(_, id, payload) = event {
                    assert_eq!(id, session);
                    ticks.push(StateMessage::decode(&payload).unwrap().tick);
                }
            }
        }
        ticks
    }

    fn connect(
        server: &mut GameServer,
        client: &mut NetworkEndpoint,
        session: SessionId,
    ) -> Vec<NetworkEvent> {
        let server_addr = server.local_addr();
        client.send_to(&Frame::Connect(session), server_addr).unwrap();
        pump(server, client)
    }

    #[test]
    fn connect_then_simulate_inputs() {
        let mut server = test_server();
        let server_addr = server.local_addr();
        let mut client = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        let client_addr = client.local_addr();

        assert_eq!(
            connect(&mut server, &mut client, 11),
            vec![NetworkEvent::Accepted(server_addr, 11)]
        );
        assert_eq!(server.client_count(), 1);

        let message = InputMessage::new(0, vec![UserInput::FORWARD; 3]);
        send_inputs(&mut client, server_addr, 11, &message);
        assert_eq!(state_ticks(&mut server, &mut client, 11, 3), vec![0, 1, 2]);
        assert_eq!(server.simulator_tick(&client_addr), Some(3));

        // Resending the same inputs is stale and produces nothing.
        send_inputs(&mut client, server_addr, 11, &message);
        client
            .send_to(&Frame::Data(11, vec![1, 2]), server_addr)
            .unwrap();
        assert!(pump(&mut server, &mut client).is_empty());
        assert_eq!(server.stats().stale_dropped, 1);
        assert_eq!(server.stats().malformed_dropped, 1);
    }

    #[test]
    fn repeated_connect_keeps_live_session() {
        let mut server = test_server();
        let server_addr = server.local_addr();
        let mut client = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        let client_addr = client.local_addr();

        connect(&mut server, &mut client, 21);
        let warmup = InputMessage::new(0, vec![UserInput::empty(); 5]);
        send_inputs(&mut client, server_addr, 21, &warmup);
        state_ticks(&mut server, &mut client, 21, 5);

        // A late copy of the original connect request is answered again.
        assert_eq!(
            connect(&mut server, &mut client, 21),
            vec![NetworkEvent::Accepted(server_addr, 21)]
        );
        assert_eq!(server.simulator_tick(&client_addr), Some(5));

        let next = InputMessage::new(5, vec![UserInput::FORWARD]);
        send_inputs(&mut client, server_addr, 21, &next);
        assert_eq!(state_ticks(&mut server, &mut client, 21, 1), vec![5]);
        assert_eq!(server.simulator_tick(&client_addr), Some(6));

        let events: Vec<ServerEvent> = server.drain_events().collect();
        let connects = events
            .iter()
            .filter(|event| matches!(event, ServerEvent::ClientConnected { .. }))
            .count();
        assert_eq!(connects, 1);
    }

    #[test]
    fn new_session_replaces_and_retires_the_old_one() {
        let mut server = test_server();
        let server_addr = server.local_addr();
        let mut client = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        let client_addr = client.local_addr();

        connect(&mut server, &mut client, 1);
        send_inputs(
            &mut client,
            server_addr,
            1,
            &InputMessage::new(0, vec![UserInput::empty(); 5]),
        );
        state_ticks(&mut server, &mut client, 1, 5);

        connect(&mut server, &mut client, 2);
        assert_eq!(server.simulator_tick(&client_addr), Some(0));
        let events: Vec<ServerEvent> = server.drain_events().collect();
        assert!(events.iter().any(|event| matches!(
            event,
            ServerEvent::ClientConnected { resumed: true, .. }
        )));

        // Delayed traffic from the ended session changes nothing.
        assert!(connect(&mut server, &mut client, 1).is_empty());
        send_inputs(
            &mut client,
            server_addr,
            1,
            &InputMessage::new(5, vec![UserInput::FORWARD]),
        );
        assert!(pump(&mut server, &mut client).is_empty());
        assert_eq!(server.simulator_tick(&client_addr), Some(0));
        assert_eq!(server.stats().foreign_session_dropped, 1);

        send_inputs(
            &mut client,
            server_addr,
            2,
            &InputMessage::new(0, vec![UserInput::empty()]),
        );
        assert_eq!(state_ticks(&mut server, &mut client, 2, 1), vec![0]);
    }

    #[test]
    fn disconnect_drops_session() {
        let mut server = test_server();
        let server_addr = server.local_addr();
        let mut client = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        let client_addr = client.local_addr();

        connect(&mut server, &mut client, 3);
        client.send_to(&Frame::Disconnect, server_addr).unwrap();

        let start = Instant::now();
        while server.client_count() > 0 && start.elapsed() < Duration::from_millis(500) {
            server.poll_once();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(server.client_count(), 0);
        assert_eq!(server.simulator_tick(&client_addr), None);

        // A connect request delayed past the disconnect does not revive it.
        assert!(connect(&mut server, &mut client, 3).is_empty());
        assert_eq!(server.client_count(), 0);
    }
}

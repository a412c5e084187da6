use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reckon::{
    BodyDynamics, ClientSession, ConnectionState, NetworkEndpoint, NetworkEvent, NetworkStats,
    PlayerController, Reconciliation, Recovery, SessionError, SessionResult, SessionStats,
    StateMessage,
};

use super::config::ClientConfig;
use super::input::InputScript;

const STATUS_INTERVAL: Duration = Duration::from_secs(5);

type PlayerSession = ClientSession<Box<dyn BodyDynamics>>;

/// Totals across every session this client has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientStats {
    pub ticks: u64,
    pub corrections: u64,
    pub snaps: u64,
    pub replayed_ticks: u64,
    pub malformed_states: u64,
    /// States tagged with a session this client has already left.
    pub foreign_states: u64,
    pub resyncs: u32,
    pub reconnects: u32,
}

impl ClientStats {
    fn absorb(&mut self, session: SessionStats) {
        self.ticks += session.ticks;
        self.corrections += session.corrections;
        self.snaps += session.snaps;
        self.replayed_ticks += session.replayed_ticks;
    }
}

/// Drives one predicted player against a server and recovers from session
/// failures by resyncing or reconnecting.
pub struct NetworkClient {
    endpoint: NetworkEndpoint,
    config: ClientConfig,
    script: InputScript,
    session: Option<PlayerSession>,
    stats: ClientStats,
    last_frame: Instant,
    last_status: Instant,
    running: Arc<AtomicBool>,
}

impl NetworkClient {
    pub fn new(config: ClientConfig, script: InputScript) -> io::Result<Self> {
        let mut endpoint = NetworkEndpoint::bind("0.0.0.0:0")?;
        endpoint.set_timeout(Duration::from_secs(config.connection_timeout_secs));
        if let Some(sim) = &config.packet_loss {
            endpoint.set_loss_simulation(sim.clone());
        }

        Ok(Self {
            endpoint,
            config,
            script,
            session: None,
            stats: ClientStats::default(),
            last_frame: Instant::now(),
            last_status: Instant::now(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.endpoint.state()
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.is_connected()
    }

    pub fn session(&self) -> Option<&PlayerSession> {
        self.session.as_ref()
    }

    /// Totals including the live session.
    pub fn stats(&self) -> ClientStats {
        let mut stats = self.stats;
        if let Some(session) = &self.session {
            stats.absorb(session.stats());
        }
        stats
    }

    pub fn network_stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Connects, retrying up to the configured number of attempts, and starts
    /// a fresh session.
    pub fn connect(&mut self) -> SessionResult<()> {
        let server = self.config.server_addr;
        let attempts = self.config.reconnect_attempts.max(1);

        let mut attempt = 1;
        loop {
            log::info!("Connecting to {} (attempt {}/{})", server, attempt, attempts);
            match self.endpoint.connect(server, self.config.connect_timeout) {
                Ok(()) => break,
                Err(e) if attempt < attempts => {
                    log::warn!("{}", e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.start_session();
        Ok(())
    }

    fn start_session(&mut self) {
        self.end_session();

        let body = self.config.backend.create(self.config.player.spawn_position);
        let controller = PlayerController::new(self.config.player.clone());
        self.session = Some(ClientSession::new(body, controller, self.config.prediction));
        self.last_frame = Instant::now();
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            self.stats.absorb(session.stats());
        }
    }

    pub fn disconnect(&mut self) {
        self.endpoint.disconnect();
        self.end_session();
    }

    /// One frame: drain the network, then run every prediction tick that is due.
    ///
    /// Errors that only cost one message are dealt with here; the rest end the
    /// frame and go to the caller for [`recover`](Self::recover).
    pub fn update(&mut self) -> SessionResult<()> {
        let now = Instant::now();
        let delta = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        let events = self
            .endpoint
            .receive()
            .map_err(|e| SessionError::ConnectFailure(e.to_string()))?;
        for event in events {
            if let Err(e) = self.handle_event(event) {
                if e.recovery() != Recovery::Ignore {
                    return Err(e);
                }
                self.recover(&e);
            }
        }

        if self.endpoint.is_timed_out() {
            return Err(SessionError::ConnectFailure("server timed out".into()));
        }

        let connected = self.endpoint.is_connected();
        let script = self.script;
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let messages = session.update(delta, connected, |tick| script.sample(tick))?;

        for message in messages {
            log::trace!("inputMessage={}", message);
            self.endpoint
                .send_data(message.encode()?)
                .map_err(|e| SessionError::ConnectFailure(e.to_string()))?;
        }

        if self.last_status.elapsed() >= STATUS_INTERVAL {
            self.last_status = Instant::now();
            self.log_status();
        }
        Ok(())
    }

    fn handle_event(&mut self, event: NetworkEvent) -> SessionResult<()> {
        let server = self.config.server_addr;
        match event {
            NetworkEvent::Data(addr, session, _)
                if addr == server && self.endpoint.session() != Some(session) =>
            {
                self.stats.foreign_states += 1;
                log::debug!("Dropping state from ended session {:08x}", session);
                Ok(())
            }
            NetworkEvent::Data(addr, _, payload) if addr == server => {
                let state = match StateMessage::decode(&payload) {
                    Ok(state) => state,
                    Err(e) => {
                        self.stats.malformed_states += 1;
                        return Err(e.into());
                    }
                };
                log::trace!("stateMessage={}", state);

                if let Some(session) = self.session.as_mut() {
                    let outcome = session.handle_state(&state)?;
                    if let Reconciliation::Corrected { .. } = outcome {
                        log::trace!("tick {}: {}", state.tick, outcome);
                    }
                }
                Ok(())
            }
            NetworkEvent::Disconnected(addr) if addr == server => Err(
                SessionError::ConnectFailure(format!("{} closed the connection", addr)),
            ),
            other => {
                log::debug!("Ignoring {:?}", other);
                Ok(())
            }
        }
    }

    /// Applies the recovery policy for `error` and returns what was done.
    pub fn recover(&mut self, error: &SessionError) -> Recovery {
        match error.recovery() {
            Recovery::Ignore => {
                match error {
                    SessionError::SerializationMismatch(_) => log::warn!("Ignoring: {}", error),
                    _ => log::debug!("Ignoring: {}", error),
                }
                Recovery::Ignore
            }
            Recovery::Resync => {
                log::warn!("{}; starting a fresh session", error);
                self.stats.resyncs += 1;
                self.disconnect();
                self.reconnect_or_terminate(Recovery::Resync)
            }
            Recovery::Reconnect => {
                log::warn!("{}; reconnecting", error);
                self.stats.reconnects += 1;
                self.end_session();
                self.reconnect_or_terminate(Recovery::Reconnect)
            }
            Recovery::Terminate => Recovery::Terminate,
        }
    }

    fn reconnect_or_terminate(&mut self, action: Recovery) -> Recovery {
        match self.connect() {
            Ok(()) => action,
            Err(e) => {
                log::error!("Giving up: {}", e);
                Recovery::Terminate
            }
        }
    }

    /// Runs until stopped, `max_ticks` total ticks have been simulated, or
    /// recovery gives up.
    pub fn run(&mut self, max_ticks: Option<u64>) -> SessionResult<()> {
        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.update() {
                if self.recover(&e) == Recovery::Terminate {
                    self.disconnect();
                    return Err(e);
                }
            }

            if max_ticks.is_some_and(|max| self.stats().ticks >= max) {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        self.disconnect();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn log_status(&self) {
        let Some(session) = &self.session else {
            return;
        };
        let (position, _) = session.rendered_transform();
        let stats = session.stats();
        log::info!(
            "tick={} ack={} corrections={} snaps={} position=({:.2}, {:.2}, {:.2})",
            session.current_tick(),
            session.latest_tick(),
            stats.corrections,
            stats.snaps,
            position.x,
            position.y,
            position.z
        );
    }
}

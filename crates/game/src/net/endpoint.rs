use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use super::connection::{ConnectionState, DEFAULT_TIMEOUT_SECS};
use super::frame::{Frame, SessionId};
use super::protocol::MAX_PACKET_SIZE;
use super::simulator::{Fate, NetworkSimulator};
use super::stats::{NetworkStats, PacketLossSimulation, rand_u64};
use crate::error::{SessionError, SessionResult};

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A peer asked to open the given session.
    Connected(SocketAddr, SessionId),
    /// A server accepted a connect request for the given session.
    Accepted(SocketAddr, SessionId),
    Data(SocketAddr, SessionId, Vec<u8>),
    Disconnected(SocketAddr),
}

/// Non-blocking UDP socket speaking the tagged [`Frame`] format.
pub struct NetworkEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    session: Option<SessionId>,
    state: ConnectionState,
    stats: NetworkStats,
    simulator: NetworkSimulator,
    recv_buffer: [u8; MAX_PACKET_SIZE],
    timeout: Duration,
    last_receive_time: Instant,
}

impl NetworkEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            remote_addr: None,
            session: None,
            state: ConnectionState::Disconnected,
            stats: NetworkStats::default(),
            simulator: NetworkSimulator::default(),
            recv_buffer: [0u8; MAX_PACKET_SIZE],
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            last_receive_time: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Session of the last [`connect`](Self::connect) call, until disconnect.
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn set_loss_simulation(&mut self, config: PacketLossSimulation) {
        self.simulator.set_config(config);
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn is_timed_out(&self) -> bool {
        self.last_receive_time.elapsed() > self.timeout
    }

    pub fn send_to(&mut self, frame: &Frame, addr: SocketAddr) -> io::Result<()> {
        let data = frame.encode();
        if data.len() > MAX_PACKET_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Packet exceeds MTU",
            ));
        }

        if !self.simulator.is_active() {
            return self.send_raw(&data, addr);
        }

        match self.simulator.enqueue(data, addr) {
            Fate::Dropped => self.stats.packets_dropped += 1,
            Fate::Duplicated => self.stats.packets_duplicated += 1,
            Fate::Queued => {}
        }
        self.flush()
    }

    pub fn send(&mut self, frame: &Frame) -> io::Result<()> {
        let addr = self
            .remote_addr
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "No remote address set"))?;
        self.send_to(frame, addr)
    }

    /// Sends `payload` to the server as part of the current session.
    pub fn send_data(&mut self, payload: Vec<u8>) -> io::Result<()> {
        let session = self
            .session
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "No session open"))?;
        self.send(&Frame::Data(session, payload))
    }

    fn send_raw(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<()> {
        let bytes = self.socket.send_to(data, addr)?;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes as u64;
        Ok(())
    }

    /// Sends every delayed datagram whose simulated latency has elapsed.
    pub fn flush(&mut self) -> io::Result<()> {
        for (data, addr) in self.simulator.take_due() {
            self.send_raw(&data, addr)?;
        }
        Ok(())
    }

    pub fn receive(&mut self) -> io::Result<Vec<NetworkEvent>> {
        self.flush()?;
        let mut events = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, addr)) => {
                    let frame = match Frame::decode(&self.recv_buffer[..size]) {
                        Ok(frame) => frame,
                        Err(e) => {
                            self.stats.packets_malformed += 1;
                            log::warn!("Dropping datagram from {}: {}", addr, e);
                            continue;
                        }
                    };

                    self.stats.packets_received += 1;
                    self.stats.bytes_received += size as u64;
                    self.last_receive_time = Instant::now();

                    events.push(match frame {
                        Frame::Connect(session) => NetworkEvent::Connected(addr, session),
                        Frame::Accept(session) => {
                            if self.remote_addr == Some(addr) && self.session == Some(session) {
                                self.state = ConnectionState::Connected;
                            }
                            NetworkEvent::Accepted(addr, session)
                        }
                        Frame::Data(session, payload) => NetworkEvent::Data(addr, session, payload),
                        Frame::Disconnect => {
                            if self.remote_addr == Some(addr) {
                                self.state = ConnectionState::Disconnected;
                            }
                            NetworkEvent::Disconnected(addr)
                        }
                    });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }

        Ok(events)
    }

    /// Opens a new session with `server`, repeating the connect request until
    /// it is accepted or `timeout` elapses. Anything else received meanwhile
    /// is discarded.
    pub fn connect(&mut self, server: SocketAddr, timeout: Duration) -> SessionResult<()> {
        let io_failure = |e: io::Error| SessionError::ConnectFailure(e.to_string());

        let session = rand_u64() as SessionId;
        self.remote_addr = Some(server);
        self.session = Some(session);
        self.state = ConnectionState::Connecting;

        let start = Instant::now();
        let mut last_request: Option<Instant> = None;
        while start.elapsed() < timeout {
            if last_request.is_none_or(|at| at.elapsed() >= CONNECT_RETRY_INTERVAL) {
                self.send(&Frame::Connect(session)).map_err(io_failure)?;
                last_request = Some(Instant::now());
            }

            let accepted = self
                .receive()
                .map_err(io_failure)?
                .into_iter()
                .any(|event| event == NetworkEvent::Accepted(server, session));
            if accepted {
                log::info!("Connected to {} (session {:08x})", server, session);
                return Ok(());
            }
            thread::sleep(Duration::from_millis(1));
        }

        self.state = ConnectionState::Disconnected;
        self.session = None;
        Err(SessionError::ConnectFailure(format!(
            "no answer from {} within {:?}",
            server, timeout
        )))
    }

    pub fn disconnect(&mut self) {
        if let Some(addr) = self.remote_addr.take() {
            if let Err(e) = self.send_to(&Frame::Disconnect, addr) {
                log::debug!("Disconnect to {} not sent: {}", addr, e);
            }
        }
        self.session = None;
        self.state = ConnectionState::Disconnected;
    }
}

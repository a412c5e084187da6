use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("server full ({max_clients} clients)")]
pub struct ServerFull {
    pub max_clients: usize,
}

#[derive(Debug)]
pub struct PeerConnection {
    pub addr: SocketAddr,
    pub state: ConnectionState,
    pub connected_at: Instant,
    pub last_receive_time: Instant,
}

impl PeerConnection {
    pub fn new(addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            addr,
            state: ConnectionState::Connected,
            connected_at: now,
            last_receive_time: now,
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_receive_time.elapsed() > timeout
    }

    pub fn touch(&mut self) {
        self.last_receive_time = Instant::now();
    }
}

/// Server-side registry of peers, keyed by their address.
#[derive(Debug)]
pub struct ConnectionManager {
    peers: HashMap<SocketAddr, PeerConnection>,
    max_clients: usize,
    timeout: Duration,
}

impl ConnectionManager {
    pub fn with_timeout(max_clients: usize, timeout_secs: u64) -> Self {
        Self {
            peers: HashMap::new(),
            max_clients,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Registers `addr`, replacing any previous connection from the same
    /// address. Returns `true` when an existing connection was replaced.
    pub fn accept(&mut self, addr: SocketAddr) -> Result<bool, ServerFull> {
        if !self.peers.contains_key(&addr) && self.peers.len() >= self.max_clients {
            return Err(ServerFull {
                max_clients: self.max_clients,
            });
        }
        Ok(self.peers.insert(addr, PeerConnection::new(addr)).is_some())
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&PeerConnection> {
        self.peers.get(addr)
    }

    /// Marks `addr` as alive; returns whether it is a known peer.
    pub fn touch(&mut self, addr: &SocketAddr) -> bool {
        match self.peers.get_mut(addr) {
            Some(peer) => {
                peer.touch();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<PeerConnection> {
        self.peers.remove(addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerConnection> {
        self.peers.values()
    }

    pub fn cleanup_timed_out(&mut self) -> Vec<SocketAddr> {
        let timed_out: Vec<SocketAddr> = self
            .peers
            .values()
            .filter(|peer| peer.is_timed_out(self.timeout))
            .map(|peer| peer.addr)
            .collect();

        for addr in &timed_out {
            self.peers.remove(addr);
        }

        timed_out
    }

    pub fn connected_count(&self) -> usize {
        self.peers
            .values()
            .filter(|peer| peer.state == ConnectionState::Connected)
            .count()
    }
}

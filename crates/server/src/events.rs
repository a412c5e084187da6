use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientConnected {
        addr: SocketAddr,
        /// A previous session from the same address was discarded.
        resumed: bool,
    },
    ClientDisconnected {
        addr: SocketAddr,
        reason: DisconnectReason,
    },
    ConnectionDenied {
        addr: SocketAddr,
        reason: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Graceful,
    Timeout,
    Shutdown,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Graceful => "disconnected",
            DisconnectReason::Timeout => "timed out",
            DisconnectReason::Shutdown => "dropped on shutdown",
        }
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::ClientConnected {
                addr,
                resumed: false,
            } => write!(f, "Client {} connected", addr),
            ServerEvent::ClientConnected {
                addr,
                resumed: true,
            } => write!(f, "Client {} reconnected, starting a fresh session", addr),
            ServerEvent::ClientDisconnected { addr, reason } => {
                write!(f, "Client {} {}", addr, reason.as_str())
            }
            ServerEvent::ConnectionDenied { addr, reason } => {
                write!(f, "Connection denied to {}: {}", addr, reason)
            }
            ServerEvent::Error { message } => f.write_str(message),
        }
    }
}

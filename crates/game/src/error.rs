use crate::net::{ProtocolError, Tick};
use crate::simulation::BufferError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("stale input message: covers up to tick {max_tick:?}, server is at {current_tick}")]
    StaleMessage {
        max_tick: Option<Tick>,
        current_tick: Tick,
    },
    #[error("prediction buffer desync: {0}")]
    BufferOverrunDesync(#[from] BufferError),
    #[error("connection failure: {0}")]
    ConnectFailure(String),
    #[error("malformed message: {0}")]
    SerializationMismatch(#[from] ProtocolError),
}

/// What a supervising loop should do about a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Drop the offending message and carry on.
    Ignore,
    /// Throw away session state and start a fresh session on a new connection.
    Resync,
    /// Re-establish the connection; give up after the configured attempts.
    Reconnect,
    /// End the session.
    Terminate,
}

impl SessionError {
    pub fn recovery(&self) -> Recovery {
        match self {
            SessionError::StaleMessage { .. } => Recovery::Ignore,
            SessionError::SerializationMismatch(_) => Recovery::Ignore,
            SessionError::BufferOverrunDesync(_) => Recovery::Resync,
            SessionError::ConnectFailure(_) => Recovery::Reconnect,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_policy() {
        let stale = SessionError::StaleMessage {
            max_tick: Some(5),
            current_tick: 8,
        };
        assert_eq!(stale.recovery(), Recovery::Ignore);

        let overrun = SessionError::from(BufferError::Overrun {
            tick: 1,
            current_tick: 2000,
            capacity: 1024,
        });
        assert_eq!(overrun.recovery(), Recovery::Resync);
        assert!(overrun.to_string().contains("1024"));

        let malformed = SessionError::from(ProtocolError::TrailingBytes(3));
        assert_eq!(malformed.recovery(), Recovery::Ignore);

        let lost = SessionError::ConnectFailure("timed out".into());
        assert_eq!(lost.recovery(), Recovery::Reconnect);
    }
}

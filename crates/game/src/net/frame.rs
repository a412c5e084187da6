const TAG_CONNECT: u8 = 1;
const TAG_ACCEPT: u8 = 2;
const TAG_DATA: u8 = 3;
const TAG_DISCONNECT: u8 = 4;

const SESSION_ID_SIZE: usize = 4;

/// Names one client session. The client draws a fresh id for every connect,
/// and every frame of that session carries it.
pub type SessionId = u32;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty datagram")]
    Empty,
    #[error("unknown frame tag {0}")]
    UnknownTag(u8),
    #[error("control frame carries {0} unexpected bytes")]
    UnexpectedPayload(usize),
    #[error("session id cut short: {0} of 4 bytes")]
    MissingSession(usize),
}

/// One datagram on the transport: a tag byte, the session id for everything
/// but [`Frame::Disconnect`], then the message bytes for [`Frame::Data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Connect(SessionId),
    Accept(SessionId),
    Data(SessionId, Vec<u8>),
    Disconnect,
}

impl Frame {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Frame::Connect(session) => tagged(TAG_CONNECT, *session, &[]),
            Frame::Accept(session) => tagged(TAG_ACCEPT, *session, &[]),
            Frame::Data(session, payload) => tagged(TAG_DATA, *session, payload),
            Frame::Disconnect => vec![TAG_DISCONNECT],
        }
    }

    pub fn decode(datagram: &[u8]) -> Result<Self, FrameError> {
        let (&tag, rest) = datagram.split_first().ok_or(FrameError::Empty)?;

        match tag {
            TAG_DISCONNECT if rest.is_empty() => Ok(Frame::Disconnect),
            TAG_DISCONNECT => Err(FrameError::UnexpectedPayload(rest.len())),
            TAG_CONNECT | TAG_ACCEPT | TAG_DATA => {
                let (session, payload) = split_session(rest)?;
                match tag {
                    TAG_DATA => Ok(Frame::Data(session, payload.to_vec())),
                    _ if !payload.is_empty() => Err(FrameError::UnexpectedPayload(payload.len())),
                    TAG_CONNECT => Ok(Frame::Connect(session)),
                    _ => Ok(Frame::Accept(session)),
                }
            }
            other => Err(FrameError::UnknownTag(other)),
        }
    }
}

fn tagged(tag: u8, session: SessionId, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + SESSION_ID_SIZE + payload.len());
    out.push(tag);
    out.extend_from_slice(&session.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn split_session(bytes: &[u8]) -> Result<(SessionId, &[u8]), FrameError> {
    if bytes.len() < SESSION_ID_SIZE {
        return Err(FrameError::MissingSession(bytes.len()));
    }
    let (id, payload) = bytes.split_at(SESSION_ID_SIZE);
    let id = SessionId::from_le_bytes([id[0], id[1], id[2], id[3]]);
    Ok((id, payload))
}

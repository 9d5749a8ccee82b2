use std::sync::Arc;
use std::time::Duration;

use screenlogic_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("dial {addr} failed: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("connection closed by controller")]
    ConnectionClosed,

    /// Outcome of a connect/login attempt, shared by every caller that
    /// waited on it.
    #[error("connect failed: {0}")]
    Connect(Arc<Error>),

    #[error("operation cancelled by shutdown")]
    Cancelled,

    #[error("adapter is shut down")]
    Shutdown,

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error leaves the byte stream in an unknown state.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Dial { .. }
                | Error::Send(_)
                | Error::Read(_)
                | Error::Timeout { .. }
                | Error::ConnectionClosed
                | Error::Cancelled
        ) || matches!(self, Error::Protocol(ProtocolError::MessageTooLarge { .. }))
    }

    /// The protocol error underneath, looking through shared connect failures.
    pub fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            Error::Protocol(e) => Some(e),
            Error::Connect(inner) => inner.protocol(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

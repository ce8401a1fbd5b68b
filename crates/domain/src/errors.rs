use crate::settings::Transport;
use thiserror::Error;

/// Fatal lifecycle errors surfaced through `FakeDns::error()` and `StartOutcome`.
///
/// Payloads are plain strings so the error can be cloned into both the start
/// outcome and the terminal error slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FakeDnsError {
    #[error("Failed to bind {transport} listener on {addr}: {reason}")]
    Bind {
        transport: Transport,
        addr: String,
        reason: String,
    },

    #[error("{transport} listener failed: {reason}")]
    SocketIo { transport: Transport, reason: String },

    #[error("Readiness probe against {addr} gave up after {attempts} attempts")]
    ProbeTimeout { addr: String, attempts: u32 },

    #[error("Readiness probe aborted: server is shutting down")]
    ProbeAborted,

    #[error("Invalid lifecycle transition: expected {expected}, server is {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Invalid zone name: {0}")]
    InvalidZone(String),

    #[error("Invalid TSIG key: {0}")]
    InvalidTsigKey(String),
}

impl FakeDnsError {
    pub fn bind(transport: Transport, addr: impl ToString, err: impl ToString) -> Self {
        Self::Bind {
            transport,
            addr: addr.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn socket_io(transport: Transport, err: impl ToString) -> Self {
        Self::SocketIo {
            transport,
            reason: err.to_string(),
        }
    }

    /// True for errors raised while the listeners were coming up.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::Bind { .. } | Self::ProbeTimeout { .. } | Self::ProbeAborted
        )
    }
}

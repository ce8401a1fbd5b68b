use crate::errors::FakeDnsError;
use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerState {
    Configured,
    Starting,
    Ready,
    Running,
    Stopped,
    Failed,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Configured => "configured",
            ServerState::Starting => "starting",
            ServerState::Ready => "ready",
            ServerState::Running => "running",
            ServerState::Stopped => "stopped",
            ServerState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerState::Stopped | ServerState::Failed)
    }

    pub fn can_transition_to(&self, next: ServerState) -> bool {
        use ServerState::*;
        match (self, next) {
            (Configured, Starting) => true,
            (Starting, Ready) => true,
            (Ready, Running) => true,
            (Ready | Running, Stopped) => true,
            (Configured | Starting | Ready | Running, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a start attempt, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Ready { addr: SocketAddr },
    Failed(FakeDnsError),
}

impl StartOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, StartOutcome::Ready { .. })
    }

    pub fn error(&self) -> Option<&FakeDnsError> {
        match self {
            StartOutcome::Ready { .. } => None,
            StartOutcome::Failed(e) => Some(e),
        }
    }
}

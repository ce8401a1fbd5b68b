//! Client side of the wire: one query out, one reply back.

pub mod tcp;
pub mod udp;

use super::tsig::TsigError;
use async_trait::async_trait;
use fakedns_domain::Transport;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Vec<u8>,

    pub protocol_used: Transport,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Timeout {stage} {server} over {transport}")]
    Timeout {
        transport: Transport,
        server: SocketAddr,
        stage: &'static str,
    },

    #[error("{transport} exchange with {server} failed: {reason}")]
    Io {
        transport: Transport,
        server: SocketAddr,
        reason: String,
    },

    #[error("Message too large: {0} bytes")]
    TooLarge(usize),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Failed to parse DNS response: {0}")]
    Parse(String),

    #[error("Response ID {actual} does not match query ID {expected}")]
    IdMismatch { expected: u16, actual: u16 },

    #[error(transparent)]
    Tsig(#[from] TsigError),
}

impl ExchangeError {
    pub(crate) fn io(transport: Transport, server: SocketAddr, err: impl ToString) -> Self {
        Self::Io {
            transport,
            server,
            reason: err.to_string(),
        }
    }
}

#[async_trait]
pub trait DnsExchange: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, ExchangeError>;

    fn transport(&self) -> Transport;

    fn server_addr(&self) -> SocketAddr;
}

pub fn create_exchange(transport: Transport, server: SocketAddr) -> Box<dyn DnsExchange> {
    match transport {
        Transport::Udp => Box::new(udp::UdpExchange::new(server)),
        Transport::Tcp => Box::new(tcp::TcpExchange::new(server)),
    }
}

//! DNS over TCP (RFC 1035 §4.2.2): two-byte length prefix per message.

use super::{DnsExchange, ExchangeError, TransportResponse};
use async_trait::async_trait;
use fakedns_domain::Transport;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

pub(crate) const MAX_TCP_MESSAGE_SIZE: usize = 65535;

/// Opens one connection per exchange.
pub struct TcpExchange {
    server_addr: SocketAddr,
}

impl TcpExchange {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    fn timeout_error(&self, stage: &'static str) -> ExchangeError {
        ExchangeError::Timeout {
            transport: Transport::Tcp,
            server: self.server_addr,
            stage,
        }
    }

    async fn connect(&self, timeout: Duration) -> Result<TcpStream, ExchangeError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(self.server_addr))
            .await
            .map_err(|_| self.timeout_error("connecting to"))?
            .map_err(|e| ExchangeError::io(Transport::Tcp, self.server_addr, e))?;

        stream
            .set_nodelay(true)
            .map_err(|e| ExchangeError::io(Transport::Tcp, self.server_addr, e))?;
        Ok(stream)
    }
}

#[async_trait]
impl DnsExchange for TcpExchange {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, ExchangeError> {
        if message_bytes.len() > MAX_TCP_MESSAGE_SIZE {
            return Err(ExchangeError::TooLarge(message_bytes.len()));
        }

        let mut stream = self.connect(timeout).await?;

        tokio::time::timeout(timeout, send_with_length_prefix(&mut stream, message_bytes))
            .await
            .map_err(|_| self.timeout_error("sending to"))?
            .map_err(|e| ExchangeError::io(Transport::Tcp, self.server_addr, e))?;

        debug!(
            server = %self.server_addr,
            message_len = message_bytes.len(),
            "TCP query sent"
        );

        let response_bytes = tokio::time::timeout(timeout, read_with_length_prefix(&mut stream))
            .await
            .map_err(|_| self.timeout_error("waiting for"))?
            .map_err(|e| ExchangeError::io(Transport::Tcp, self.server_addr, e))?;

        debug!(
            server = %self.server_addr,
            response_len = response_bytes.len(),
            "TCP response received"
        );

        Ok(TransportResponse {
            bytes: response_bytes,
            protocol_used: Transport::Tcp,
        })
    }

    fn transport(&self) -> Transport {
        Transport::Tcp
    }

    fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }
}

pub(crate) async fn send_with_length_prefix<S>(stream: &mut S, message_bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWriteExt + Unpin,
{
    let length = u16::try_from(message_bytes.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message of {} bytes exceeds TCP framing", message_bytes.len()),
        )
    })?;

    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(message_bytes).await?;
    stream.flush().await
}

pub(crate) async fn read_with_length_prefix<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let message_len = u16::from_be_bytes(len_buf) as usize;
    let mut message = vec![0u8; message_len];
    stream.read_exact(&mut message).await?;
    Ok(message)
}

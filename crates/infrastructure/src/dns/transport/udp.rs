//! DNS over UDP (RFC 1035 §4.2.1): one datagram each way, no framing.

use super::{DnsExchange, ExchangeError, TransportResponse};
use async_trait::async_trait;
use fakedns_domain::Transport;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct UdpExchange {
    server_addr: SocketAddr,
}

impl UdpExchange {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    fn timeout_error(&self, stage: &'static str) -> ExchangeError {
        ExchangeError::Timeout {
            transport: Transport::Udp,
            server: self.server_addr,
            stage,
        }
    }
}

#[async_trait]
impl DnsExchange for UdpExchange {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, ExchangeError> {
        let bind_addr: SocketAddr = if self.server_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| ExchangeError::io(Transport::Udp, self.server_addr, e))?;

        let bytes_sent =
            tokio::time::timeout(timeout, socket.send_to(message_bytes, self.server_addr))
                .await
                .map_err(|_| self.timeout_error("sending to"))?
                .map_err(|e| ExchangeError::io(Transport::Udp, self.server_addr, e))?;

        debug!(server = %self.server_addr, bytes_sent, "UDP query sent");

        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
        let (bytes_received, from_addr) =
            tokio::time::timeout(timeout, socket.recv_from(&mut recv_buf))
                .await
                .map_err(|_| self.timeout_error("waiting for"))?
                .map_err(|e| ExchangeError::io(Transport::Udp, self.server_addr, e))?;

        if from_addr.ip() != self.server_addr.ip() {
            warn!(
                expected = %self.server_addr,
                received_from = %from_addr,
                "UDP response from unexpected source"
            );
        }

        recv_buf.truncate(bytes_received);
        debug!(server = %self.server_addr, bytes_received, "UDP response received");

        Ok(TransportResponse {
            bytes: recv_buf,
            protocol_used: Transport::Udp,
        })
    }

    fn transport(&self) -> Transport {
        Transport::Udp
    }

    fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_exchange_echo() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (n, from) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(&buf[..n], from).await.unwrap();
        });

        let exchange = UdpExchange::new(server_addr);
        let response = exchange
            .send(b"ping", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response.bytes, b"ping");
        assert_eq!(response.protocol_used, Transport::Udp);
    }

    #[tokio::test]
    async fn test_udp_exchange_times_out_without_reply() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let exchange = UdpExchange::new(silent.local_addr().unwrap());

        let result = exchange.send(b"ping", Duration::from_millis(100)).await;

        assert!(matches!(result, Err(ExchangeError::Timeout { .. })));
    }
}

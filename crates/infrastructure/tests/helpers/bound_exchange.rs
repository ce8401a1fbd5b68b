#![allow(dead_code)]
use async_trait::async_trait;
use fakedns_domain::Transport;
use fakedns_infrastructure::dns::{DnsExchange, ExchangeError, TransportResponse};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

/// UDP exchange sending from a chosen source address, so one test can act as
/// several clients on the loopback network.
pub struct BoundUdpExchange {
    source: IpAddr,
    server: SocketAddr,
}

impl BoundUdpExchange {
    pub fn new(source: IpAddr, server: SocketAddr) -> Self {
        Self { source, server }
    }
}

#[async_trait]
impl DnsExchange for BoundUdpExchange {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, ExchangeError> {
        let io = |e: std::io::Error| ExchangeError::Io {
            transport: Transport::Udp,
            server: self.server,
            reason: e.to_string(),
        };
        let socket = UdpSocket::bind((self.source, 0)).await.map_err(io)?;
        socket.send_to(message_bytes, self.server).await.map_err(io)?;

        let mut buf = vec![0u8; 4096];
        let (n, _) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| ExchangeError::Timeout {
                transport: Transport::Udp,
                server: self.server,
                stage: "waiting for",
            })?
            .map_err(io)?;
        buf.truncate(n);

        Ok(TransportResponse {
            bytes: buf,
            protocol_used: Transport::Udp,
        })
    }

    fn transport(&self) -> Transport {
        Transport::Udp
    }

    fn server_addr(&self) -> SocketAddr {
        self.server
    }
}

use super::client::DnsClient;
use fakedns_domain::{FakeDnsError, ProbePolicy, RecordType, Transport};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Polls the server's own socket until a real query round-trip succeeds.
pub struct ReadinessProbe {
    client: DnsClient,
    target: SocketAddr,
    zone: String,
    policy: ProbePolicy,
}

impl ReadinessProbe {
    pub fn new(transport: Transport, target: SocketAddr, zone: impl Into<String>, policy: ProbePolicy) -> Self {
        Self {
            client: DnsClient::new(transport, target).with_timeout(policy.timeout),
            target,
            zone: zone.into(),
            policy,
        }
    }

    /// Any well-formed reply carrying the query's ID counts as ready.
    /// Returns `ProbeAborted` as soon as `done` fires.
    pub async fn wait_ready(&self, done: &CancellationToken) -> Result<(), FakeDnsError> {
        for attempt in 1..=self.policy.attempts {
            let outcome = tokio::select! {
                _ = done.cancelled() => return Err(FakeDnsError::ProbeAborted),
                outcome = self.attempt() => outcome,
            };

            match outcome {
                Ok(()) => {
                    info!(
                        target = %self.target,
                        protocol = %self.client.transport(),
                        attempt,
                        "Server ready"
                    );
                    return Ok(());
                }
                Err(reason) => {
                    debug!(target = %self.target, attempt, reason = %reason, "Readiness probe failed");
                }
            }

            if attempt < self.policy.attempts {
                tokio::select! {
                    _ = done.cancelled() => return Err(FakeDnsError::ProbeAborted),
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        Err(FakeDnsError::ProbeTimeout {
            addr: self.target.to_string(),
            attempts: self.policy.attempts,
        })
    }

    async fn attempt(&self) -> Result<(), String> {
        let query = self
            .client
            .build(&self.zone, RecordType::A)
            .map_err(|e| e.to_string())?;
        self.client
            .exchange(&query)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::UdpSocket;

    fn fast_policy(attempts: u32) -> ProbePolicy {
        ProbePolicy::new(attempts, Duration::from_millis(10), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_probe_times_out_against_silent_socket() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let probe = ReadinessProbe::new(
            Transport::Udp,
            silent.local_addr().unwrap(),
            "cloud.example.com.",
            fast_policy(3),
        );

        let result = probe.wait_ready(&CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(FakeDnsError::ProbeTimeout { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_aborts_when_done_fires() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let probe = ReadinessProbe::new(
            Transport::Udp,
            silent.local_addr().unwrap(),
            "cloud.example.com.",
            ProbePolicy::new(1000, Duration::from_millis(10), Duration::from_secs(1)),
        );
        let done = CancellationToken::new();
        done.cancel();

        assert_eq!(probe.wait_ready(&done).await, Err(FakeDnsError::ProbeAborted));
    }

    #[tokio::test]
    async fn test_probe_succeeds_on_echoed_reply() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (n, from) = server.recv_from(&mut buf).await.unwrap();
            buf[2] |= 0x80;
            server.send_to(&buf[..n], from).await.unwrap();
        });

        let probe = ReadinessProbe::new(Transport::Udp, addr, "cloud.example.com.", fast_policy(5));

        assert_eq!(probe.wait_ready(&CancellationToken::new()).await, Ok(()));
    }
}

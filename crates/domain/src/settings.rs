use crate::tsig::TsigKeyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PROBE_ATTEMPTS: u32 = 20;
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Transport a listener serves. Datagram listeners bind before stream listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "UDP",
            Transport::Tcp => "TCP",
        }
    }

    pub fn all() -> BTreeSet<Transport> {
        BTreeSet::from([Transport::Udp, Transport::Tcp])
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where answers come from.
///
/// `Static` answers only records added through the builder. `Reflect` answers
/// only addresses synthesized from the querying clients; builder records are
/// ignored. `StaticAndReflect` keeps both in the same store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    #[default]
    Static,
    Reflect,
    StaticAndReflect,
}

impl AnswerMode {
    pub fn accepts_static_records(&self) -> bool {
        matches!(self, AnswerMode::Static | AnswerMode::StaticAndReflect)
    }

    pub fn reflects_clients(&self) -> bool {
        matches!(self, AnswerMode::Reflect | AnswerMode::StaticAndReflect)
    }
}

/// Retry budget of the readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub attempts: u32,
    /// Pause between two failed attempts.
    pub interval: Duration,
    /// Upper bound for a single query round-trip.
    pub timeout: Duration,
}

impl ProbePolicy {
    pub fn new(attempts: u32, interval: Duration, timeout: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
            timeout,
        }
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_PROBE_ATTEMPTS,
            interval: DEFAULT_PROBE_INTERVAL,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Immutable configuration of one fake DNS server instance.
#[derive(Debug, Clone)]
pub struct Settings {
    port: u16,
    bind_address: IpAddr,
    edge_zone: String,
    answer_zone: String,
    transports: BTreeSet<Transport>,
    answer_mode: AnswerMode,
    probe: ProbePolicy,
    tsig_keys: Vec<TsigKeyConfig>,
}

impl Settings {
    /// `edge_zone` is the zone routed to the responder, `answer_zone` the name
    /// the readiness probe asks for and the owner of synthesized addresses.
    pub fn new(port: u16, edge_zone: impl Into<String>, answer_zone: impl Into<String>) -> Self {
        Self {
            port,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            edge_zone: edge_zone.into(),
            answer_zone: answer_zone.into(),
            transports: Transport::all(),
            answer_mode: AnswerMode::default(),
            probe: ProbePolicy::default(),
            tsig_keys: Vec::new(),
        }
    }

    pub fn with_bind_address(mut self, bind_address: IpAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// An empty set falls back to serving both transports.
    pub fn with_transports(mut self, transports: impl IntoIterator<Item = Transport>) -> Self {
        let transports: BTreeSet<Transport> = transports.into_iter().collect();
        self.transports = if transports.is_empty() {
            Transport::all()
        } else {
            transports
        };
        self
    }

    pub fn with_answer_mode(mut self, answer_mode: AnswerMode) -> Self {
        self.answer_mode = answer_mode;
        self
    }

    pub fn with_probe(mut self, probe: ProbePolicy) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_tsig_key(mut self, key: TsigKeyConfig) -> Self {
        self.tsig_keys.push(key);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn bind_address(&self) -> IpAddr {
        self.bind_address
    }

    pub fn bind_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Address the server can reach itself on once bound to `port`.
    pub fn probe_target(&self, port: u16) -> SocketAddr {
        let ip = match self.bind_address {
            IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(v6) if v6.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            other => other,
        };
        SocketAddr::new(ip, port)
    }

    pub fn edge_zone(&self) -> &str {
        &self.edge_zone
    }

    pub fn answer_zone(&self) -> &str {
        &self.answer_zone
    }

    /// Query name that triggers the half-message truncation simulation.
    /// `tc.` under the root zone.
    pub fn truncation_sentinel(&self) -> String {
        match self.edge_zone.trim_end_matches('.') {
            "" => "tc.".to_string(),
            zone => format!("tc.{}.", zone),
        }
    }

    pub fn transports(&self) -> &BTreeSet<Transport> {
        &self.transports
    }

    pub fn serves(&self, transport: Transport) -> bool {
        self.transports.contains(&transport)
    }

    pub fn answer_mode(&self) -> AnswerMode {
        self.answer_mode
    }

    pub fn probe(&self) -> ProbePolicy {
        self.probe
    }

    pub fn tsig_keys(&self) -> &[TsigKeyConfig] {
        &self.tsig_keys
    }
}

use super::RecordType;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Type-specific payload of a canned answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RecordData {
    A {
        address: Ipv4Addr,
    },
    AAAA {
        address: Ipv6Addr,
    },
    NS {
        nameserver: String,
    },
    TXT {
        values: Vec<String>,
    },
    CNAME {
        target: String,
    },
    MX {
        preference: u16,
        exchange: String,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A { .. } => RecordType::A,
            RecordData::AAAA { .. } => RecordType::AAAA,
            RecordData::NS { .. } => RecordType::NS,
            RecordData::TXT { .. } => RecordType::TXT,
            RecordData::CNAME { .. } => RecordType::CNAME,
            RecordData::MX { .. } => RecordType::MX,
            RecordData::SRV { .. } => RecordType::SRV,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceRecord {
    pub name: String,

    #[serde(default)]
    pub ttl: u32,

    #[serde(flatten)]
    pub data: RecordData,
}

impl ResourceRecord {
    pub fn new(name: impl Into<String>, data: RecordData) -> Self {
        Self {
            name: name.into(),
            ttl: 0,
            data,
        }
    }

    pub fn a(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self::new(name, RecordData::A { address })
    }

    pub fn aaaa(name: impl Into<String>, address: Ipv6Addr) -> Self {
        Self::new(name, RecordData::AAAA { address })
    }

    /// A or AAAA depending on the address family.
    pub fn address(name: impl Into<String>, address: IpAddr) -> Self {
        match address {
            IpAddr::V4(v4) => Self::a(name, v4),
            IpAddr::V6(v6) => Self::aaaa(name, v6),
        }
    }

    pub fn ns(name: impl Into<String>, nameserver: impl Into<String>) -> Self {
        Self::new(
            name,
            RecordData::NS {
                nameserver: nameserver.into(),
            },
        )
    }

    pub fn txt<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            RecordData::TXT {
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn cname(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            RecordData::CNAME {
                target: target.into(),
            },
        )
    }

    pub fn mx(name: impl Into<String>, preference: u16, exchange: impl Into<String>) -> Self {
        Self::new(
            name,
            RecordData::MX {
                preference,
                exchange: exchange.into(),
            },
        )
    }

    pub fn srv(
        name: impl Into<String>,
        priority: u16,
        weight: u16,
        port: u16,
        target: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            RecordData::SRV {
                priority,
                weight,
                port,
                target: target.into(),
            },
        )
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    /// DNS name equality: ASCII case-insensitive, trailing root dot optional.
    pub fn owner_matches(&self, qname: &str) -> bool {
        normalize_name(&self.name).eq_ignore_ascii_case(normalize_name(qname))
    }

    pub fn ip_address(&self) -> Option<IpAddr> {
        match self.data {
            RecordData::A { address } => Some(IpAddr::V4(address)),
            RecordData::AAAA { address } => Some(IpAddr::V6(address)),
            _ => None,
        }
    }
}

fn normalize_name(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

use std::net::IpAddr;
use std::sync::Arc;

/// One inbound question as seen by the answering use case.
#[derive(Debug, Clone)]
pub struct DnsRequest {
    pub domain: Arc<str>,
    /// Raw QTYPE; types the fake does not model simply have no answers.
    pub query_type: u16,
    pub client_ip: IpAddr,
}

impl DnsRequest {
    pub fn new(domain: impl Into<Arc<str>>, query_type: u16, client_ip: IpAddr) -> Self {
        Self {
            domain: domain.into(),
            query_type,
            client_ip,
        }
    }
}

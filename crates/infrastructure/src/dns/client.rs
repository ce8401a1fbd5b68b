use super::query_builder::{OutgoingQuery, QueryBuilder};
use super::response_parser::{DnsResponse, ResponseParser};
use super::transport::{create_exchange, DnsExchange, ExchangeError};
use super::tsig::{self, TsigKey};
use super::wire;
use fakedns_domain::{RecordType, Transport};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Stub client for talking to a fake server, optionally signing with TSIG.
pub struct DnsClient {
    exchange: Box<dyn DnsExchange>,
    timeout: Duration,
    key: Option<TsigKey>,
}

impl DnsClient {
    pub fn new(transport: Transport, server: SocketAddr) -> Self {
        Self::with_exchange(create_exchange(transport, server))
    }

    pub fn with_exchange(exchange: Box<dyn DnsExchange>) -> Self {
        Self {
            exchange,
            timeout: DEFAULT_QUERY_TIMEOUT,
            key: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Signs every query with `key` and requires signed replies.
    pub fn with_tsig_key(mut self, key: TsigKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn transport(&self) -> Transport {
        self.exchange.transport()
    }

    pub fn build(&self, domain: &str, record_type: RecordType) -> Result<OutgoingQuery, ExchangeError> {
        match &self.key {
            Some(key) => QueryBuilder::build_signed_query(domain, record_type, key),
            None => QueryBuilder::build_query(domain, record_type),
        }
    }

    /// Sends `query` and returns the raw reply once its ID matches.
    pub async fn exchange(&self, query: &OutgoingQuery) -> Result<Vec<u8>, ExchangeError> {
        let response = self.exchange.send(&query.bytes, self.timeout).await?;
        let actual = wire::message_id(&response.bytes)
            .map_err(|e| ExchangeError::Parse(e.to_string()))?;
        if actual != query.id || !wire::is_response(&response.bytes) {
            return Err(ExchangeError::IdMismatch {
                expected: query.id,
                actual,
            });
        }
        Ok(response.bytes)
    }

    pub async fn query(&self, domain: &str, record_type: RecordType) -> Result<DnsResponse, ExchangeError> {
        let query = self.build(domain, record_type)?;
        let bytes = self.exchange(&query).await?;

        let bytes = match (&self.key, &query.mac) {
            (Some(key), Some(mac)) => key.verify_response(&bytes, mac, tsig::unix_now())?,
            _ => bytes,
        };
        ResponseParser::parse(&bytes)
    }
}

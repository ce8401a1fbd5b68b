use super::transport::ExchangeError;
use super::wire;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{RData, Record};
use std::net::IpAddr;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DnsResponse {
    pub id: u16,

    pub rcode: ResponseCode,

    pub truncated: bool,

    /// A and AAAA answers in answer order.
    pub addresses: Vec<IpAddr>,

    pub answers: Vec<Record>,

    pub message: Message,
}

impl DnsResponse {
    pub fn is_refused(&self) -> bool {
        self.rcode == ResponseCode::Refused
    }

    pub fn is_nodata(&self) -> bool {
        self.rcode == ResponseCode::NoError && self.answers.is_empty()
    }
}

pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response_bytes: &[u8]) -> Result<DnsResponse, ExchangeError> {
        let message = Message::from_vec(response_bytes)
            .map_err(|e| ExchangeError::Parse(e.to_string()))?;

        let id = wire::message_id(response_bytes).map_err(|e| ExchangeError::Parse(e.to_string()))?;
        let rcode = message.response_code();
        let truncated = message.truncated();
        let answers = message.answers().to_vec();

        let addresses: Vec<IpAddr> = answers
            .iter()
            .filter_map(|record| match record.data() {
                RData::A(a) => Some(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            })
            .collect();

        debug!(
            id,
            rcode = ?rcode,
            answers = answers.len(),
            addresses = addresses.len(),
            truncated,
            "DNS response parsed"
        );

        Ok(DnsResponse {
            id,
            rcode,
            truncated,
            addresses,
            answers,
            message,
        })
    }
}

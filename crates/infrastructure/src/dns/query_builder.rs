//! Wire-format query construction with `hickory-proto`.

use super::transport::ExchangeError;
use super::tsig::{self, TsigKey};
use fakedns_domain::RecordType;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType as HickoryRecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;

/// A serialized query with the values needed to match its reply.
#[derive(Debug, Clone)]
pub struct OutgoingQuery {
    pub id: u16,
    pub bytes: Vec<u8>,
    /// MAC of the query when it was signed.
    pub mac: Option<Vec<u8>>,
}

pub struct QueryBuilder;

impl QueryBuilder {
    /// Recursive query for `domain` with a random ID.
    pub fn build_query(domain: &str, record_type: RecordType) -> Result<OutgoingQuery, ExchangeError> {
        Self::build_query_with_id(fastrand::u16(..), domain, record_type.to_u16())
    }

    /// Query with a caller-chosen ID and raw QTYPE.
    pub fn build_query_with_id(
        id: u16,
        domain: &str,
        query_type: u16,
    ) -> Result<OutgoingQuery, ExchangeError> {
        let name = Name::from_str(domain).map_err(|e| {
            ExchangeError::InvalidQuery(format!("Invalid domain '{}': {}", domain, e))
        })?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(HickoryRecordType::from(query_type));
        query.set_query_class(DNSClass::IN);

        let mut message = Message::new(id, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        Ok(OutgoingQuery {
            id,
            bytes: Self::serialize_message(&message)?,
            mac: None,
        })
    }

    /// Query signed with `key` at the current time.
    pub fn build_signed_query(
        domain: &str,
        record_type: RecordType,
        key: &TsigKey,
    ) -> Result<OutgoingQuery, ExchangeError> {
        let query = Self::build_query(domain, record_type)?;
        let (bytes, mac) = key.sign_query(&query.bytes, tsig::unix_now())?;
        Ok(OutgoingQuery {
            id: query.id,
            bytes,
            mac: Some(mac),
        })
    }

    fn serialize_message(message: &Message) -> Result<Vec<u8>, ExchangeError> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);

        message.emit(&mut encoder).map_err(|e| {
            ExchangeError::InvalidQuery(format!("Failed to serialize DNS message: {}", e))
        })?;

        Ok(buf)
    }
}

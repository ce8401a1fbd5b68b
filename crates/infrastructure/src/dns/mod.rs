pub mod client;
pub mod listener;
pub mod probe;
pub mod query_builder;
pub mod responder;
pub mod response_parser;
pub mod router;
pub mod transport;
pub mod tsig;
pub mod wire;

pub use client::DnsClient;
pub use listener::TransportListener;
pub use probe::ReadinessProbe;
pub use query_builder::{OutgoingQuery, QueryBuilder};
pub use responder::Responder;
pub use response_parser::{DnsResponse, ResponseParser};
pub use router::{InboundQuery, QueryHandler, ZoneRouter};
pub use transport::{DnsExchange, ExchangeError, TransportResponse};
pub use tsig::{SignedMessage, TsigError, TsigKey, TsigKeyring};
pub use wire::{WireError, WireName};

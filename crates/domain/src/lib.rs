//! Fake DNS domain layer: settings, canned records and lifecycle types.
pub mod config;
pub mod dns_record;
pub mod dns_request;
pub mod errors;
pub mod lifecycle;
pub mod settings;
pub mod tsig;

pub use config::{CliOverrides, ConfigError, FakeDnsConfig};
pub use dns_record::{RecordData, RecordType, ResourceRecord};
pub use dns_request::DnsRequest;
pub use errors::FakeDnsError;
pub use lifecycle::{ServerState, StartOutcome};
pub use settings::{AnswerMode, ProbePolicy, Settings, Transport};
pub use tsig::{TsigAlgorithm, TsigKeyConfig};

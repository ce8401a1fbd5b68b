use crate::ports::RecordRepository;
use fakedns_domain::{AnswerMode, DnsRequest, RecordType, ResourceRecord};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Selects the answer section for one question.
///
/// Address types (A, AAAA) are scoped to the owner name; every other type
/// answers all stored records of that type whatever name was asked for.
pub struct AnswerQueryUseCase {
    records: Arc<dyn RecordRepository>,
    answer_mode: AnswerMode,
    answer_zone: Arc<str>,
}

impl AnswerQueryUseCase {
    pub fn new(
        records: Arc<dyn RecordRepository>,
        answer_mode: AnswerMode,
        answer_zone: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            records,
            answer_mode,
            answer_zone: answer_zone.into(),
        }
    }

    pub fn execute(&self, request: &DnsRequest) -> Vec<ResourceRecord> {
        if self.answer_mode.reflects_clients() {
            self.reflect(request.client_ip);
        }

        let Some(record_type) = RecordType::from_u16(request.query_type) else {
            debug!(query_type = request.query_type, "No records modelled for query type");
            return Vec::new();
        };

        self.records
            .lookup(record_type)
            .into_iter()
            .filter(|record| !record_type.is_address() || record.owner_matches(&request.domain))
            .collect()
    }

    /// Stores the client's own address under the answer zone.
    fn reflect(&self, client_ip: IpAddr) {
        let client_ip = client_ip.to_canonical();
        let record = ResourceRecord::address(self.answer_zone.as_ref(), client_ip);
        if self.records.add_if_absent(record) {
            debug!(client = %client_ip, zone = %self.answer_zone, "Reflected client address");
        }
    }
}

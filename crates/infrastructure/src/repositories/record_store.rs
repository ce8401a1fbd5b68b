use dashmap::DashMap;
use fakedns_application::ports::RecordRepository;
use fakedns_domain::{RecordType, ResourceRecord};

/// In-memory record index keyed by query type.
///
/// Each type keeps its records in insertion order. Writes to one type hold
/// that shard's lock, so the reflection path can run from both transports.
#[derive(Default)]
pub struct RecordStore {
    records: DashMap<RecordType, Vec<ResourceRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_count(&self) -> usize {
        self.records.len()
    }
}

impl RecordRepository for RecordStore {
    fn add(&self, record: ResourceRecord) {
        self.records
            .entry(record.record_type())
            .or_default()
            .push(record);
    }

    fn add_if_absent(&self, record: ResourceRecord) -> bool {
        let mut entry = self.records.entry(record.record_type()).or_default();
        if entry.contains(&record) {
            return false;
        }
        entry.push(record);
        true
    }

    fn lookup(&self, record_type: RecordType) -> Vec<ResourceRecord> {
        self.records
            .get(&record_type)
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }
}

#![allow(dead_code)]

use fakedns_application::ports::RecordRepository;
use fakedns_domain::{RecordType, ResourceRecord};
use std::sync::RwLock;

/// Flat list store; lookups scan in insertion order.
#[derive(Default)]
pub struct MockRecordRepository {
    records: RwLock<Vec<ResourceRecord>>,
}

impl MockRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    pub fn all(&self) -> Vec<ResourceRecord> {
        self.records.read().unwrap().clone()
    }
}

impl RecordRepository for MockRecordRepository {
    fn add(&self, record: ResourceRecord) {
        self.records.write().unwrap().push(record);
    }

    fn add_if_absent(&self, record: ResourceRecord) -> bool {
        let mut records = self.records.write().unwrap();
        if records.contains(&record) {
            return false;
        }
        records.push(record);
        true
    }

    fn lookup(&self, record_type: RecordType) -> Vec<ResourceRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.record_type() == record_type)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

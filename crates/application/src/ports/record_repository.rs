use fakedns_domain::{RecordType, ResourceRecord};

/// Canned answers, indexed by record type in insertion order.
pub trait RecordRepository: Send + Sync {
    fn add(&self, record: ResourceRecord);

    /// Appends `record` unless an identical one is already stored.
    /// Returns `true` when the record was added.
    fn add_if_absent(&self, record: ResourceRecord) -> bool;

    /// Stored records of `record_type`; empty when none were added.
    fn lookup(&self, record_type: RecordType) -> Vec<ResourceRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

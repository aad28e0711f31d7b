//! Schema tracker support (spec §4.7): the multi-schema partitioner
//! decorator, and the pure "is this a new schema" predicate the write
//! loop consults.

use sink_common::Record;

use crate::interfaces::{PartitionField, Partitioner, TimestampExtractor};

/// Wraps a `Partitioner` so `encode_partition` incorporates the record's
/// schema name, causing different schemas to land in distinct
/// directories (spec §4.7, §9 "decorator, not inheritance").
pub struct MultiSchemaPartitioner {
    inner: Box<dyn Partitioner>,
}

impl MultiSchemaPartitioner {
    pub fn new(inner: Box<dyn Partitioner>) -> Self {
        MultiSchemaPartitioner { inner }
    }
}

impl Partitioner for MultiSchemaPartitioner {
    fn encode_partition(&self, record: &Record) -> String {
        let base = self.inner.encode_partition(record);
        match &record.value_schema_name {
            Some(name) => format!("{name}/{base}"),
            None => base,
        }
    }

    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String {
        self.inner.generate_partitioned_path(topic, encoded_partition)
    }

    fn partition_fields(&self) -> Vec<PartitionField> {
        self.inner.partition_fields()
    }

    fn supports_timestamp_extractor(&self) -> Option<&dyn TimestampExtractor> {
        self.inner.supports_timestamp_extractor()
    }
}

/// Wrap `partitioner` in the schema-aware decorator iff `multi_schema_support`
/// is enabled (spec §4.7).
pub fn wrap_if_multi_schema(
    partitioner: Box<dyn Partitioner>,
    multi_schema_support: bool,
) -> Box<dyn Partitioner> {
    if multi_schema_support {
        Box::new(MultiSchemaPartitioner::new(partitioner))
    } else {
        partitioner
    }
}

/// The "new schema" predicate of spec §4.1's WRITE_PARTITION_PAUSED step:
///
/// `(recordCounter <= 0 OR multiSchemaSupport) AND valueSchema present AND
/// currentSchema absent`, OR the compatibility policy reports a change is
/// due.
pub fn is_new_schema(
    record_counter: u64,
    multi_schema_support: bool,
    value_schema_present: bool,
    current_schema_absent: bool,
    compatibility_says_change: bool,
) -> bool {
    let first_clause = (record_counter == 0 || multi_schema_support)
        && value_schema_present
        && current_schema_absent;
    first_clause || compatibility_says_change
}

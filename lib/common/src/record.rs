use serde_json::Value;
use uuid::Uuid;

/// A single record arriving on a source partition.
///
/// `offset` is the kafka-offset of the record within `(topic, partition)`;
/// `timestamp` is millis since epoch as supplied by the upstream source.
/// `value_schema_name` is present only when the record carries a typed
/// value (e.g. Avro/Protobuf); records without a schema never trigger
/// schema-change handling.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: Uuid,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: i64,
    pub value_schema_name: Option<String>,
    pub value: Value,
}

impl Record {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, value: Value) -> Self {
        Record {
            id: Uuid::now_v7(),
            topic: topic.into(),
            partition,
            offset,
            timestamp: 0,
            value_schema_name: None,
            value,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        self.value_schema_name = Some(name.into());
        self
    }
}

impl From<(String, i32, i64, Value)> for Record {
    fn from((topic, partition, offset, value): (String, i32, i64, Value)) -> Self {
        Record::new(topic, partition, offset, value)
    }
}

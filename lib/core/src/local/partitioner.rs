//! Reference `Partitioner` implementations (spec §6): partitioning by one
//! or more top-level record fields, and time-based partitioning aligned
//! to a timestamp extractor.

use chrono::TimeZone;
use chrono_tz::Tz;

use sink_common::Record;

use crate::interfaces::{PartitionField, Partitioner, TimestampExtractor};

/// Partitions on the string form of a fixed set of top-level JSON fields,
/// e.g. `["region"]` encodes `region=us-east`.
pub struct FieldPartitioner {
    fields: Vec<String>,
}

impl FieldPartitioner {
    pub fn new(fields: Vec<String>) -> Self {
        FieldPartitioner { fields }
    }
}

impl Partitioner for FieldPartitioner {
    fn encode_partition(&self, record: &Record) -> String {
        self.fields
            .iter()
            .map(|field| {
                let value = record
                    .value
                    .get(field)
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_else(|| "null".to_string());
                format!("{field}={value}")
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String {
        format!("{topic}/{encoded_partition}")
    }

    fn partition_fields(&self) -> Vec<PartitionField> {
        self.fields
            .iter()
            .map(|name| PartitionField { name: name.clone() })
            .collect()
    }
}

/// Partitions by calendar path (`year=YYYY/month=MM/day=DD`) derived from
/// a `TimestampExtractor`, exposed via `supports_timestamp_extractor` so
/// the rotation evaluator can pick up the same notion of "now" (spec
/// §4.3, §9 capability-interface redesign).
pub struct TimeBasedPartitioner {
    extractor: Box<dyn TimestampExtractor>,
    timezone: Tz,
}

impl TimeBasedPartitioner {
    pub fn new(extractor: Box<dyn TimestampExtractor>, timezone: Tz) -> Self {
        TimeBasedPartitioner { extractor, timezone }
    }
}

impl Partitioner for TimeBasedPartitioner {
    fn encode_partition(&self, record: &Record) -> String {
        let millis = self.extractor.extract(record);
        let dt = self
            .timezone
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(|| self.timezone.timestamp_millis_opt(0).unwrap());
        format!(
            "year={:04}/month={:02}/day={:02}",
            dt.format("%Y").to_string().parse::<i32>().unwrap_or(1970),
            dt.format("%m").to_string().parse::<u32>().unwrap_or(1),
            dt.format("%d").to_string().parse::<u32>().unwrap_or(1),
        )
    }

    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String {
        format!("{topic}/{encoded_partition}")
    }

    fn partition_fields(&self) -> Vec<PartitionField> {
        vec![
            PartitionField { name: "year".to_string() },
            PartitionField { name: "month".to_string() },
            PartitionField { name: "day".to_string() },
        ]
    }

    fn supports_timestamp_extractor(&self) -> Option<&dyn TimestampExtractor> {
        Some(self.extractor.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::wallclock::WallClockExtractor;
    use serde_json::json;

    #[test]
    fn field_partitioner_joins_fields_in_order() {
        let partitioner = FieldPartitioner::new(vec!["region".to_string(), "tier".to_string()]);
        let record = Record::new("t", 0, 0, json!({"region": "us-east", "tier": 1}));
        assert_eq!(partitioner.encode_partition(&record), "region=us-east/tier=1");
    }

    #[test]
    fn field_partitioner_defaults_missing_fields_to_null() {
        let partitioner = FieldPartitioner::new(vec!["missing".to_string()]);
        let record = Record::new("t", 0, 0, json!({}));
        assert_eq!(partitioner.encode_partition(&record), "missing=null");
    }

    #[test]
    fn time_based_partitioner_exposes_its_extractor() {
        let partitioner =
            TimeBasedPartitioner::new(Box::new(WallClockExtractor), chrono_tz::UTC);
        assert!(partitioner.supports_timestamp_extractor().is_some());
    }
}

//! Drives a `PartitionWriter` per assigned topic-partition from NDJSON
//! records read off stdin, against the `local` filesystem/Parquet
//! reference adapters.
//!
//! # Design Notes
//! - One writer per `(topic, partition)`, created lazily on first sight,
//!   matching spec §3's per-partition ownership model.
//! - No consumer group exists here to really pause/resume: `LoggingContext`
//!   just logs the calls. A real connector deployment wires these to the
//!   host's actual task context instead.

use std::collections::BTreeMap;
use std::io::BufRead;

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Deserialize;

use sink_common::Record;
use sink_config::SinkConfig;
use sink_core::local::clock::SystemClock;
use sink_core::local::context::LoggingContext;
use sink_core::local::fs::FsStorage;
use sink_core::local::hive::LoggingHiveService;
use sink_core::local::parquet_writer::ParquetRecordWriterProvider;
use sink_core::local::partitioner::TimeBasedPartitioner;
use sink_core::local::schema::{InMemorySchemaTracker, NameSchemaCompatibility};
use sink_core::local::wallclock::WallClockExtractor;
use sink_core::{PartitionWriter, RotationConfig, TopicPartition, WriterConfig};

/// Wire shape of one NDJSON input line.
#[derive(Debug, Deserialize)]
struct IncomingRecord {
    topic: String,
    partition: i32,
    offset: i64,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    schema: Option<String>,
    value: serde_json::Value,
}

impl From<IncomingRecord> for Record {
    fn from(r: IncomingRecord) -> Self {
        let mut record = Record::new(r.topic, r.partition, r.offset, r.value).with_timestamp(r.timestamp);
        if let Some(schema) = r.schema {
            record = record.with_schema(schema);
        }
        record
    }
}

pub struct App {
    config: SinkConfig,
    writers: BTreeMap<TopicPartition, PartitionWriter>,
}

impl App {
    pub fn new(config: SinkConfig) -> Self {
        App {
            config,
            writers: BTreeMap::new(),
        }
    }

    /// Consume NDJSON records from `input` until EOF, draining each
    /// partition's writer after every line and once more at shutdown.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        for line in input.lines() {
            let line = line.context("reading input line")?;
            if line.trim().is_empty() {
                continue;
            }
            let incoming: IncomingRecord =
                serde_json::from_str(&line).context("parsing input record")?;
            let record: Record = incoming.into();
            let tp = TopicPartition::new(record.topic.clone(), record.partition);

            let writer = self.writer_for(&tp)?;
            writer.buffer(record);
            writer.write()?;
        }

        info!("input exhausted, flushing all partitions");
        for (tp, writer) in self.writers.iter_mut() {
            if let Err(e) = writer.write() {
                error!("final flush failed for {}-{}: {e}", tp.topic, tp.partition);
            }
        }
        Ok(())
    }

    fn writer_for(&mut self, tp: &TopicPartition) -> Result<&mut PartitionWriter> {
        if !self.writers.contains_key(tp) {
            let writer = self.build_writer(tp)?;
            self.writers.insert(tp.clone(), writer);
        }
        Ok(self.writers.get_mut(tp).expect("just inserted"))
    }

    fn build_writer(&self, tp: &TopicPartition) -> Result<PartitionWriter> {
        let timezone: chrono_tz::Tz = self
            .config
            .partitioner_timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid partitioner timezone"))?;

        // `topics_dir`/`logs_dir` are relative subpaths under the process's
        // working directory; `FsStorage`'s root is the directory they're
        // both relative to, not the topics directory itself.
        let storage = FsStorage::new(".");
        let writer_config = WriterConfig {
            topics_dir: self.config.topics_dir.to_string_lossy().into_owned(),
            logs_dir: self.config.logs_dir.to_string_lossy().into_owned(),
            rotation: RotationConfig {
                flush_size: self.config.flush_size,
                rotate_interval_ms: self.config.rotate_interval_ms,
                rotate_schedule_interval_ms: self.config.rotate_schedule_interval_ms,
                timezone,
            },
            retry_backoff_ms: self.config.retry_backoff_ms,
            zero_pad_width: self.config.filename_offset_zero_pad_width,
            hive_integration: self.config.hive_integration,
            multi_schema_support: self.config.multi_schema_support,
        };

        if self.config.schema_compatibility != "NONE" {
            warn!(
                "schema.compatibility={} is not enforced by the local schema stand-in; \
                 schema changes are detected by name only",
                self.config.schema_compatibility
            );
        }

        let hive_service: Option<Box<dyn sink_core::HiveService>> = if writer_config.hive_integration
        {
            Some(Box::new(LoggingHiveService))
        } else {
            None
        };

        let writer = PartitionWriter::new(
            tp.topic.clone(),
            tp.partition,
            writer_config,
            Box::new(storage),
            Box::new(ParquetRecordWriterProvider),
            Box::new(TimeBasedPartitioner::new(Box::new(WallClockExtractor), timezone)),
            Box::new(InMemorySchemaTracker::default()),
            Box::new(NameSchemaCompatibility),
            hive_service,
            Box::new(LoggingContext),
            Box::new(SystemClock),
        )?;
        Ok(writer)
    }
}

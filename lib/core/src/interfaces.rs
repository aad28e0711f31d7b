//! External collaborators consumed by the core (spec §6). The core only
//! calls through these traits; concrete implementations (filesystem
//! storage, a real WAL, a schema registry client, ...) live outside this
//! crate or in `local` as reference adapters.

use sink_common::Record;

use crate::error::{Result, SinkError};

/// Identifies a source partition the writer is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        TopicPartition {
            topic: topic.into(),
            partition,
        }
    }
}

/// An opaque schema handle. The core never inspects the contents; it only
/// threads `name` through `SchemaTracker`/`SchemaCompatibility` calls.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub value: serde_json::Value,
}

/// Directory/file primitives of the backing object store (spec §6).
pub trait Storage: Send {
    fn url(&self) -> String;
    fn exists(&self, path: &str) -> Result<bool>;
    fn create(&self, path: &str) -> Result<()>;
    /// Atomically promote `src` to `dst` (rename/move semantics).
    fn commit(&self, src: &str, dst: &str) -> Result<()>;
    fn delete(&self, path: &str) -> Result<()>;
    fn wal(&self, logs_dir: &str, partition: &TopicPartition) -> Result<Box<dyn Wal>>;
    /// Recursively list committed-file paths under `dir`. Not named by
    /// spec §6's interface list, but required by recovery's directory
    /// scan (spec §4.1 step 4); added here rather than assumed away.
    fn list_committed_files(&self, dir: &str) -> Result<Vec<String>>;
}

/// Write-ahead log for one source partition (spec §6).
pub trait Wal: Send {
    fn append(&mut self, key: &str, value: &str) -> Result<()>;
    /// Replay the log, performing any storage renames recorded between a
    /// complete begin/end marker bracket. Idempotent: safe to call on an
    /// already-applied log.
    fn apply(&mut self) -> Result<()>;
    fn truncate(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn log_file(&self) -> String;
}

pub const WAL_BEGIN_MARKER: &str = "BEGIN";
pub const WAL_END_MARKER: &str = "END";

/// Constructs a `RecordWriter` bound to a temp-file path (spec §6).
pub trait RecordWriterProvider: Send {
    fn get_record_writer(
        &self,
        temp_path: &str,
        sample_record: &Record,
    ) -> Result<Box<dyn RecordWriter>>;
    fn extension(&self) -> &str;
}

/// An open sink for one temp file.
pub trait RecordWriter: Send {
    fn write(&mut self, record: &Record) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// A single partition-field descriptor used by a `Partitioner`.
#[derive(Debug, Clone)]
pub struct PartitionField {
    pub name: String,
}

/// Assigns records to partition paths (spec §6).
///
/// `supports_timestamp_extractor` is the capability-interface redesign of
/// spec §9: rather than the core runtime-type-testing the partitioner to
/// discover whether it is time-based, the partitioner exposes its
/// extractor (or `None`) directly.
pub trait Partitioner: Send {
    fn encode_partition(&self, record: &Record) -> String;
    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String;
    fn partition_fields(&self) -> Vec<PartitionField>;
    fn supports_timestamp_extractor(&self) -> Option<&dyn TimestampExtractor> {
        None
    }
}

/// Derives a record-time in millis since epoch (spec §6).
pub trait TimestampExtractor: Send + Sync {
    fn extract(&self, record: &Record) -> i64;
    /// `true` for the distinguished wall-clock extractor (spec §4.3/§9):
    /// the rotation evaluator uses `now()` instead of a record timestamp
    /// when this is set, and `lastRotate` is seeded at construction
    /// rather than on first write.
    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Schema-catalog side effect hook (spec §6), optional (`hive.integration`).
pub trait HiveService: Send {
    fn create_hive_table(&self, schema: &Schema) -> Result<()>;
    fn alter_hive_schema(&self, schema: &Schema) -> Result<()>;
    fn add_hive_partition(&self, record: &Record, schema: Option<&Schema>) -> Result<()>;
}

/// Host task context the writer drives pause/resume/seek/backoff through
/// (spec §6).
pub trait SinkTaskContext: Send {
    fn pause(&self, partition: &TopicPartition);
    fn resume(&self, partition: &TopicPartition);
    fn seek(&self, partition: &TopicPartition, offset: i64);
    fn timeout(&self, ms: i64);
}

/// Per-partition current-schema memory and change detection (spec §4.7).
/// A thin adaptor the core treats as a black box.
pub trait SchemaTracker: Send {
    fn get_or_load_current_schema(
        &mut self,
        name: &str,
        offset: i64,
    ) -> Result<Option<Schema>>;
    fn update(&mut self, schema: Schema);
}

/// Schema-compatibility policy: decides whether a schema change is due,
/// and projects a record onto the current schema (spec §4.1/§4.7).
/// Projection failures are fatal (spec §7).
pub trait SchemaCompatibility: Send {
    /// `previous` is the schema of the writer's currently-open epoch;
    /// `current` is whatever the tracker has registered under the
    /// incoming record's own schema name (`None` the first time that name
    /// is seen). A transition is usually a comparison against `previous`,
    /// not `current` — `current` only tells you whether this name is
    /// already known, not what the writer is mid-epoch on.
    fn should_change_schema(
        &self,
        record: &Record,
        previous: Option<&Schema>,
        current: Option<&Schema>,
    ) -> bool;

    fn project(&self, record: Record, current: Option<&Schema>) -> std::result::Result<Record, SinkError>;
}

/// Wall-clock seam so rotation-timer tests can inject a fixed time
/// instead of reading the system clock (spec §4.3 scenarios 4–5).
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

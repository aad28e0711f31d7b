//! The concrete scenarios of spec §8, exercised end to end through
//! `PartitionWriter` against the `local` reference adapters.

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;

use chrono::TimeZone;
use serde_json::json;
use tempfile::tempdir;

use sink_common::Record;

use crate::interfaces::{Storage, TopicPartition, Wal, WAL_BEGIN_MARKER, WAL_END_MARKER};
use crate::local::fs::FsStorage;
use crate::local::parquet_writer::ParquetRecordWriterProvider;
use crate::local::partitioner::{FieldPartitioner, TimeBasedPartitioner};
use crate::local::wallclock::WallClockExtractor;
use crate::naming;
use crate::rotation::RotationConfig;
use crate::state::{PartitionWriter, WriterConfig};
use crate::tests::support::{
    FlakyStorage, NameCompatibility, NoopSchemaTracker, RecordingContext, RecordingHiveService,
    SharedClock,
};

fn committed_names(root: &Path) -> Vec<String> {
    let storage = FsStorage::new(root);
    storage
        .list_committed_files("topics")
        .unwrap()
        .iter()
        .map(|f| Path::new(f).file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

fn no_rotation_config() -> RotationConfig {
    RotationConfig {
        flush_size: 0,
        rotate_interval_ms: 0,
        rotate_schedule_interval_ms: 0,
        timezone: chrono_tz::UTC,
    }
}

#[test]
fn size_rotation_commits_at_flush_size_boundaries() {
    let dir = tempdir().unwrap();

    let storage = FsStorage::new(dir.path());
    let config = WriterConfig {
        topics_dir: "topics".to_string(),
        logs_dir: "logs".to_string(),
        rotation: RotationConfig {
            flush_size: 3,
            ..no_rotation_config()
        },
        retry_backoff_ms: 1_000,
        zero_pad_width: 20,
        hive_integration: false,
        multi_schema_support: false,
    };

    let mut writer = PartitionWriter::new(
        "mytopic",
        0,
        config,
        Box::new(storage),
        Box::new(ParquetRecordWriterProvider),
        Box::new(FieldPartitioner::new(vec!["p".to_string()])),
        Box::new(NoopSchemaTracker::default()),
        Box::new(NameCompatibility),
        None,
        Box::new(RecordingContext::default()),
        Box::new(SharedClock(Arc::new(AtomicI64::new(0)))),
    )
    .unwrap();

    for offset in 100..106 {
        writer.buffer(Record::new("mytopic", 0, offset, json!({"p": "x"})));
    }
    writer.write().unwrap();

    assert_eq!(writer.offset(), 106);
    let names = committed_names(dir.path());
    assert!(names.contains(&naming::committed_filename("mytopic", 0, 100, 102, "parquet", 20)));
    assert!(names.contains(&naming::committed_filename("mytopic", 0, 103, 105, "parquet", 20)));
}

#[test]
fn schema_change_mid_batch_commits_before_writing_new_schema() {
    let dir = tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    let hive = RecordingHiveService::default();
    let config = WriterConfig {
        topics_dir: "topics".to_string(),
        logs_dir: "logs".to_string(),
        rotation: RotationConfig {
            flush_size: 10,
            ..no_rotation_config()
        },
        retry_backoff_ms: 1_000,
        zero_pad_width: 20,
        hive_integration: true,
        multi_schema_support: false,
    };

    let mut writer = PartitionWriter::new(
        "mytopic",
        0,
        config,
        Box::new(storage),
        Box::new(ParquetRecordWriterProvider),
        Box::new(FieldPartitioner::new(vec!["p".to_string()])),
        Box::new(NoopSchemaTracker::default()),
        Box::new(NameCompatibility),
        Some(Box::new(hive.clone())),
        Box::new(RecordingContext::default()),
        Box::new(SharedClock(Arc::new(AtomicI64::new(0)))),
    )
    .unwrap();

    writer.buffer(Record::new("mytopic", 0, 200, json!({"p": "x"})).with_schema("schemaA"));
    writer.buffer(Record::new("mytopic", 0, 201, json!({"p": "x"})).with_schema("schemaA"));
    writer.buffer(Record::new("mytopic", 0, 202, json!({"p": "x"})).with_schema("schemaB"));
    writer.write().unwrap();

    let names = committed_names(dir.path());
    assert_eq!(names, vec![naming::committed_filename("mytopic", 0, 200, 201, "parquet", 20)]);

    let calls = hive.snapshot();
    let create_b = calls.iter().position(|c| c == "create_hive_table:schemaB").unwrap();
    let alter_b = calls.iter().position(|c| c == "alter_hive_schema:schemaB").unwrap();
    assert!(create_b < alter_b);
}

#[test]
fn recovery_replays_wal_and_seeks_to_scanned_offset() {
    let dir = tempdir().unwrap();
    let storage = FsStorage::new(dir.path());

    fs::create_dir_all(dir.path().join("topics/mytopic/p=x/+tmp")).unwrap();
    let temp_rel = "topics/mytopic/p=x/+tmp/mytopic+0+p=x.parquet.tmp";
    fs::write(dir.path().join(temp_rel), b"orphaned-rotation-output").unwrap();

    let committed_name = naming::committed_filename("mytopic", 0, 50, 59, "parquet", 20);
    {
        let tp = TopicPartition::new("mytopic", 0);
        let mut wal = storage.wal("logs", &tp).unwrap();
        wal.append(WAL_BEGIN_MARKER, "").unwrap();
        wal.append(temp_rel, &committed_name).unwrap();
        wal.append(WAL_END_MARKER, "").unwrap();
    }

    let context = RecordingContext::default();
    let config = WriterConfig {
        topics_dir: "topics".to_string(),
        logs_dir: "logs".to_string(),
        rotation: no_rotation_config(),
        retry_backoff_ms: 1_000,
        zero_pad_width: 20,
        hive_integration: false,
        multi_schema_support: false,
    };

    let mut writer = PartitionWriter::new(
        "mytopic",
        0,
        config,
        Box::new(storage),
        Box::new(ParquetRecordWriterProvider),
        Box::new(FieldPartitioner::new(vec!["p".to_string()])),
        Box::new(NoopSchemaTracker::default()),
        Box::new(NameCompatibility),
        None,
        Box::new(context.clone()),
        Box::new(SharedClock(Arc::new(AtomicI64::new(0)))),
    )
    .unwrap();

    writer.write().unwrap();

    assert_eq!(writer.offset(), 60);
    assert!(context.snapshot().contains(&"seek:60".to_string()));
    assert!(!dir.path().join(temp_rel).exists());
    assert!(dir.path().join("topics/mytopic/p=x").join(&committed_name).exists());
}

#[test]
fn tail_flush_fires_once_the_wall_clock_interval_elapses() {
    let dir = tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    let time = Arc::new(AtomicI64::new(0));
    let config = WriterConfig {
        topics_dir: "topics".to_string(),
        logs_dir: "logs".to_string(),
        rotation: RotationConfig {
            rotate_interval_ms: 60_000,
            ..no_rotation_config()
        },
        retry_backoff_ms: 1_000,
        zero_pad_width: 20,
        hive_integration: false,
        multi_schema_support: false,
    };

    let mut writer = PartitionWriter::new(
        "mytopic",
        0,
        config,
        Box::new(storage),
        Box::new(ParquetRecordWriterProvider),
        Box::new(TimeBasedPartitioner::new(Box::new(WallClockExtractor), chrono_tz::UTC)),
        Box::new(NoopSchemaTracker::default()),
        Box::new(NameCompatibility),
        None,
        Box::new(RecordingContext::default()),
        Box::new(SharedClock(time.clone())),
    )
    .unwrap();

    writer.buffer(Record::new("mytopic", 0, 10, json!({})));
    writer.buffer(Record::new("mytopic", 0, 11, json!({})));
    writer.write().unwrap();
    assert!(committed_names(dir.path()).is_empty());

    time.store(60_001, std::sync::atomic::Ordering::SeqCst);
    writer.write().unwrap();

    let names = committed_names(dir.path());
    assert!(names.iter().any(|n| n.contains("+00000000000000000010+00000000000000000011")));
}

#[test]
fn scheduled_rotation_fires_at_the_day_aligned_slot() {
    let dir = tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    let start = chrono_tz::UTC
        .with_ymd_and_hms(2024, 1, 1, 10, 17, 0)
        .unwrap()
        .timestamp_millis();
    let time = Arc::new(AtomicI64::new(start));

    let config = WriterConfig {
        topics_dir: "topics".to_string(),
        logs_dir: "logs".to_string(),
        rotation: RotationConfig {
            rotate_schedule_interval_ms: 3_600_000,
            ..no_rotation_config()
        },
        retry_backoff_ms: 1_000,
        zero_pad_width: 20,
        hive_integration: false,
        multi_schema_support: false,
    };

    let mut writer = PartitionWriter::new(
        "mytopic",
        0,
        config,
        Box::new(storage),
        Box::new(ParquetRecordWriterProvider),
        Box::new(FieldPartitioner::new(vec!["p".to_string()])),
        Box::new(NoopSchemaTracker::default()),
        Box::new(NameCompatibility),
        None,
        Box::new(RecordingContext::default()),
        Box::new(SharedClock(time.clone())),
    )
    .unwrap();

    writer.buffer(Record::new("mytopic", 0, 0, json!({"p": "x"})));
    writer.write().unwrap();
    assert!(committed_names(dir.path()).is_empty());

    let next = chrono_tz::UTC
        .with_ymd_and_hms(2024, 1, 1, 11, 0, 0)
        .unwrap()
        .timestamp_millis();
    time.store(next, std::sync::atomic::Ordering::SeqCst);
    writer.write().unwrap();

    assert!(!committed_names(dir.path()).is_empty());
}

#[test]
fn a_transient_commit_failure_backs_off_and_resumes_at_wal_appended() {
    let dir = tempdir().unwrap();
    let storage = FlakyStorage::new(FsStorage::new(dir.path()), 1);
    let time = Arc::new(AtomicI64::new(0));
    let config = WriterConfig {
        topics_dir: "topics".to_string(),
        logs_dir: "logs".to_string(),
        rotation: RotationConfig {
            flush_size: 1,
            ..no_rotation_config()
        },
        retry_backoff_ms: 1_000,
        zero_pad_width: 20,
        hive_integration: false,
        multi_schema_support: false,
    };

    let mut writer = PartitionWriter::new(
        "mytopic",
        0,
        config,
        Box::new(storage),
        Box::new(ParquetRecordWriterProvider),
        Box::new(FieldPartitioner::new(vec!["p".to_string()])),
        Box::new(NoopSchemaTracker::default()),
        Box::new(NameCompatibility),
        None,
        Box::new(RecordingContext::default()),
        Box::new(SharedClock(time.clone())),
    )
    .unwrap();

    writer.buffer(Record::new("mytopic", 0, 0, json!({"p": "x"})));
    writer.buffer(Record::new("mytopic", 0, 1, json!({"p": "x"})));

    // First record writes, rotation is due before the second, and the
    // commit fails: this write() must not panic and must not commit.
    writer.write().unwrap();
    assert!(committed_names(dir.path()).is_empty());

    // Immediate retry inside the backoff window is a no-op.
    writer.write().unwrap();
    assert!(committed_names(dir.path()).is_empty());

    // Past the backoff window, the commit is retried to success, and the
    // write loop resumes draining the rest of the buffer.
    time.store(2_000, std::sync::atomic::Ordering::SeqCst);
    writer.write().unwrap();

    let names = committed_names(dir.path());
    assert!(names.iter().any(|n| n.contains("+00000000000000000000+00000000000000000000")));
}

//! Fakes shared by the scenario tests in spec §8.

use std::cell::Cell;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use sink_common::Record;

use crate::error::{Result, SinkError};
use crate::interfaces::{
    Clock, HiveService, Schema, SchemaCompatibility, SchemaTracker, SinkTaskContext,
    Storage, TopicPartition, Wal,
};
use crate::local::fs::FsStorage;

#[derive(Default)]
pub struct NoopSchemaTracker {
    current: Option<Schema>,
}

impl SchemaTracker for NoopSchemaTracker {
    fn get_or_load_current_schema(&mut self, name: &str, _offset: i64) -> Result<Option<Schema>> {
        Ok(self
            .current
            .as_ref()
            .filter(|s| s.name == name)
            .cloned())
    }

    fn update(&mut self, schema: Schema) {
        self.current = Some(schema);
    }
}

/// Treats two schemas as different whenever their names differ, and
/// never rewrites a record (identity projection).
pub struct NameCompatibility;

impl SchemaCompatibility for NameCompatibility {
    fn should_change_schema(
        &self,
        record: &Record,
        previous: Option<&Schema>,
        _current: Option<&Schema>,
    ) -> bool {
        match (&record.value_schema_name, previous) {
            (Some(name), Some(previous)) => name != &previous.name,
            _ => false,
        }
    }

    fn project(&self, record: Record, _current: Option<&Schema>) -> std::result::Result<Record, SinkError> {
        Ok(record)
    }
}

#[derive(Default, Clone)]
pub struct RecordingContext {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingContext {
    pub fn snapshot(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl SinkTaskContext for RecordingContext {
    fn pause(&self, partition: &TopicPartition) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("pause:{}-{}", partition.topic, partition.partition));
    }

    fn resume(&self, partition: &TopicPartition) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("resume:{}-{}", partition.topic, partition.partition));
    }

    fn seek(&self, _partition: &TopicPartition, offset: i64) {
        self.calls.lock().unwrap().push(format!("seek:{offset}"));
    }

    fn timeout(&self, ms: i64) {
        self.calls.lock().unwrap().push(format!("timeout:{ms}"));
    }
}

pub struct SharedClock(pub Arc<AtomicI64>);

impl Clock for SharedClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default, Clone)]
pub struct RecordingHiveService {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingHiveService {
    pub fn snapshot(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl HiveService for RecordingHiveService {
    fn create_hive_table(&self, schema: &Schema) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create_hive_table:{}", schema.name));
        Ok(())
    }

    fn alter_hive_schema(&self, schema: &Schema) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("alter_hive_schema:{}", schema.name));
        Ok(())
    }

    fn add_hive_partition(&self, _record: &Record, _schema: Option<&Schema>) -> Result<()> {
        Ok(())
    }
}

/// Wraps a real `FsStorage` but fails the first `commits_to_fail` calls
/// to `commit`, to exercise the transient-I/O backoff path (spec §7/§8
/// scenario 6).
pub struct FlakyStorage {
    inner: FsStorage,
    commits_to_fail: Cell<u32>,
}

impl FlakyStorage {
    pub fn new(inner: FsStorage, commits_to_fail: u32) -> Self {
        FlakyStorage {
            inner,
            commits_to_fail: Cell::new(commits_to_fail),
        }
    }
}

impl Storage for FlakyStorage {
    fn url(&self) -> String {
        self.inner.url()
    }

    fn exists(&self, path: &str) -> Result<bool> {
        self.inner.exists(path)
    }

    fn create(&self, path: &str) -> Result<()> {
        self.inner.create(path)
    }

    fn commit(&self, src: &str, dst: &str) -> Result<()> {
        let remaining = self.commits_to_fail.get();
        if remaining > 0 {
            self.commits_to_fail.set(remaining - 1);
            return Err(SinkError::io(anyhow::anyhow!("simulated commit failure")));
        }
        self.inner.commit(src, dst)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path)
    }

    fn wal(&self, logs_dir: &str, partition: &TopicPartition) -> Result<Box<dyn Wal>> {
        self.inner.wal(logs_dir, partition)
    }

    fn list_committed_files(&self, dir: &str) -> Result<Vec<String>> {
        self.inner.list_committed_files(dir)
    }
}

//! The per-partition state machine (spec §4.1): recovery, then a write
//! loop that drains the buffer and rotates/commits temp files in place.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use sink_common::Record;

use crate::commit;
use crate::error::{Result, SinkError};
use crate::interfaces::{
    Clock, HiveService, Partitioner, RecordWriterProvider, Schema, SchemaCompatibility,
    SchemaTracker, SinkTaskContext, Storage, TopicPartition, Wal,
};
use crate::naming;
use crate::registry::WriterRegistry;
use crate::rotation::{should_rotate, RotationConfig, RotationTimers};
use crate::schema::{self, wrap_if_multi_schema};
use crate::wal::{WalCoordinator, WalEntry};

/// States of spec §4.1. Recovery states never recur once `recovered` is
/// set; the write loop cycles through the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    RecoveryStarted,
    RecoveryPartitionPaused,
    WalApplied,
    WalTruncated,
    OffsetReset,
    WriteStarted,
    WritePartitionPaused,
    ShouldRotate,
    TempFileClosed,
    WalAppended,
    FileCommitted,
}

/// Static configuration a `PartitionWriter` is built with.
pub struct WriterConfig {
    pub topics_dir: String,
    pub logs_dir: String,
    pub rotation: RotationConfig,
    pub retry_backoff_ms: i64,
    pub zero_pad_width: usize,
    pub hive_integration: bool,
    pub multi_schema_support: bool,
}

enum HeadRecordOutcome {
    Wrote,
    SchemaDeferred,
    RotationDue,
}

/// Owns one source partition's write path end to end: recovery, buffering,
/// rotation, WAL bookkeeping and commit (spec §3, §4).
pub struct PartitionWriter {
    tp: TopicPartition,
    config: WriterConfig,

    storage: Box<dyn Storage>,
    wal: Box<dyn Wal>,
    provider: Box<dyn RecordWriterProvider>,
    partitioner: Box<dyn Partitioner>,
    schema_tracker: Box<dyn SchemaTracker>,
    compatibility: Box<dyn SchemaCompatibility>,
    hive_service: Option<Box<dyn HiveService>>,
    context: Box<dyn SinkTaskContext>,
    clock: Box<dyn Clock>,

    state: State,
    recovered: bool,
    buffer: VecDeque<Record>,
    registry: WriterRegistry,
    wal_coordinator: WalCoordinator,
    rotation_timers: RotationTimers,
    start_offsets: BTreeMap<String, i64>,
    end_offsets: BTreeMap<String, i64>,
    hive_partitions: BTreeSet<String>,

    offset: i64,
    record_counter: u64,
    failure_time: i64,
    is_wall_clock: bool,
    last_record_timestamp: i64,
    /// The schema identity of the writer's currently-open epoch, distinct
    /// from `schema_tracker`'s by-name registry lookup: this is what a
    /// transition check compares an incoming record's schema *against*.
    current_schema: Option<Schema>,
}

#[allow(clippy::too_many_arguments)]
impl PartitionWriter {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        config: WriterConfig,
        storage: Box<dyn Storage>,
        provider: Box<dyn RecordWriterProvider>,
        partitioner: Box<dyn Partitioner>,
        schema_tracker: Box<dyn SchemaTracker>,
        compatibility: Box<dyn SchemaCompatibility>,
        hive_service: Option<Box<dyn HiveService>>,
        context: Box<dyn SinkTaskContext>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let tp = TopicPartition::new(topic, partition);
        let wal = storage.wal(&config.logs_dir, &tp)?;
        let partitioner = wrap_if_multi_schema(partitioner, config.multi_schema_support);
        let is_wall_clock = partitioner
            .supports_timestamp_extractor()
            .map(|e| e.is_wall_clock())
            .unwrap_or(false);

        let mut rotation_timers = RotationTimers::default();
        let now = clock.now_millis();
        if is_wall_clock {
            rotation_timers.seed_wall_clock(now);
        }
        rotation_timers.ensure_scheduled(&config.rotation, now);

        Ok(PartitionWriter {
            tp,
            config,
            storage,
            wal,
            provider,
            partitioner,
            schema_tracker,
            compatibility,
            hive_service,
            context,
            clock,
            state: State::RecoveryStarted,
            recovered: false,
            buffer: VecDeque::new(),
            registry: WriterRegistry::new(),
            wal_coordinator: WalCoordinator::new(),
            rotation_timers,
            start_offsets: BTreeMap::new(),
            end_offsets: BTreeMap::new(),
            hive_partitions: BTreeSet::new(),
            // Sentinel "no commits yet" (spec §3); recovery overwrites it
            // with the scanned maximum, if any committed file exists.
            offset: -1,
            record_counter: 0,
            failure_time: -1,
            is_wall_clock,
            last_record_timestamp: 0,
            current_schema: None,
        })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn buffer(&mut self, record: Record) {
        self.buffer.push_back(record);
    }

    fn past_backoff(&self, now: i64) -> bool {
        self.failure_time < 0 || now - self.failure_time >= self.config.retry_backoff_ms
    }

    fn record_failure(&mut self, now: i64) {
        self.failure_time = now;
        self.context.timeout(self.config.retry_backoff_ms);
    }

    /// Runs the recovery prefix of spec §4.1 to completion, or stops (and
    /// requests a retry) at whichever step fails. Idempotent: a second
    /// call once `recovered` is set is a no-op returning `true`.
    fn recover(&mut self, now: i64) -> bool {
        if self.recovered {
            return true;
        }
        match self.recover_inner() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("recovery failed in state {:?}: {e}", self.state);
                self.record_failure(now);
                false
            }
        }
    }

    fn recover_inner(&mut self) -> Result<()> {
        loop {
            match self.state {
                State::RecoveryStarted => {
                    self.context.pause(&self.tp);
                    self.state = State::RecoveryPartitionPaused;
                }
                State::RecoveryPartitionPaused => {
                    self.wal.apply()?;
                    self.state = State::WalApplied;
                }
                State::WalApplied => {
                    self.wal.truncate()?;
                    self.state = State::WalTruncated;
                }
                State::WalTruncated => {
                    self.scan_and_set_offset()?;
                    self.state = State::OffsetReset;
                }
                State::OffsetReset => {
                    if self.offset > 0 {
                        self.context.seek(&self.tp, self.offset);
                    }
                    self.context.resume(&self.tp);
                    self.recovered = true;
                    self.state = State::WriteStarted;
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_and_set_offset(&mut self) -> Result<()> {
        let files = self.storage.list_committed_files(&self.config.topics_dir)?;
        let prefix = format!("{}+{}+", self.tp.topic, self.tp.partition);
        let max_end = files
            .iter()
            .filter_map(|path| {
                let name = path.rsplit('/').next().unwrap_or(path);
                if name.starts_with(&prefix) {
                    naming::parse_end_offset(name)
                } else {
                    None
                }
            })
            .max();
        if let Some(max_end) = max_end {
            self.offset = max_end + 1;
        }
        Ok(())
    }

    /// Drains as much of the buffer as rotation/backoff allow (spec §4.1,
    /// §4.2). A fatal error (schema projection, catalog, illegal state)
    /// surfaces to the caller; transient I/O errors are swallowed here
    /// after recording `failureTime` and requesting a backoff.
    pub fn write(&mut self) -> Result<()> {
        let now = self.clock.now_millis();
        if !self.past_backoff(now) {
            return Ok(());
        }
        self.failure_time = -1;

        if !self.recovered && !self.recover(now) {
            return Ok(());
        }

        loop {
            match self.state {
                State::WriteStarted => {
                    self.context.pause(&self.tp);
                    self.state = State::WritePartitionPaused;
                }
                State::WritePartitionPaused => {
                    if self.buffer.is_empty() {
                        break;
                    }
                    match self.process_head_record(now)? {
                        HeadRecordOutcome::Wrote | HeadRecordOutcome::SchemaDeferred => {}
                        HeadRecordOutcome::RotationDue => {
                            self.state = State::ShouldRotate;
                        }
                    }
                }
                State::ShouldRotate => match self.do_should_rotate(now) {
                    Ok(()) => self.state = State::TempFileClosed,
                    Err(e) => return self.abandon_rotation(now, e),
                },
                State::TempFileClosed => match self.do_wal_append() {
                    Ok(()) => self.state = State::WalAppended,
                    Err(e) => return self.abandon_rotation(now, e),
                },
                State::WalAppended => match self.do_commit() {
                    Ok(()) => self.state = State::FileCommitted,
                    Err(e) => return self.abandon_rotation(now, e),
                },
                State::FileCommitted => {
                    self.state = State::WritePartitionPaused;
                }
                _ => unreachable!("recovery states are resolved before the write loop runs"),
            }
        }

        self.maybe_tail_flush(now)?;

        self.context.resume(&self.tp);
        self.state = State::WriteStarted;
        Ok(())
    }

    /// An I/O failure mid-rotation (spec §4.2): consumption is still
    /// resumed so the host doesn't deadlock, and the failing state is
    /// retried verbatim on the next `write()`.
    fn abandon_rotation(&mut self, now: i64, err: SinkError) -> Result<()> {
        if err.is_fatal() {
            return Err(err);
        }
        log::warn!("rotation step failed in state {:?}: {err}", self.state);
        self.record_failure(now);
        self.context.resume(&self.tp);
        Ok(())
    }

    fn process_head_record(&mut self, now: i64) -> Result<HeadRecordOutcome> {
        let record = self.buffer.front().expect("checked non-empty").clone();
        let value_schema_present = record.value_schema_name.is_some();
        let current_schema = match &record.value_schema_name {
            Some(name) => self
                .schema_tracker
                .get_or_load_current_schema(name, self.offset)?,
            None => None,
        };
        let compatibility_says_change = self.compatibility.should_change_schema(
            &record,
            self.current_schema.as_ref(),
            current_schema.as_ref(),
        );

        let new_schema = schema::is_new_schema(
            self.record_counter,
            self.config.multi_schema_support,
            value_schema_present,
            current_schema.is_none(),
            compatibility_says_change,
        );

        if new_schema {
            let schema_obj = Schema {
                name: record
                    .value_schema_name
                    .clone()
                    .expect("new-schema predicate implies a value schema is present"),
                value: record.value.clone(),
            };
            self.schema_tracker.update(schema_obj.clone());
            self.current_schema = Some(schema_obj.clone());

            if self.config.hive_integration {
                let hive = self
                    .hive_service
                    .as_deref()
                    .expect("hive_service set whenever hive_integration is enabled");
                hive.create_hive_table(&schema_obj)?;
                hive.alter_hive_schema(&schema_obj)?;
            }

            return Ok(if self.record_counter > 0 {
                HeadRecordOutcome::RotationDue
            } else {
                HeadRecordOutcome::SchemaDeferred
            });
        }

        let current_ts = self.record_rotation_timestamp(&record, now);
        if !self.is_wall_clock {
            self.rotation_timers.seed_on_first_write(current_ts);
        }

        if should_rotate(
            &self.config.rotation,
            &self.rotation_timers,
            self.record_counter,
            current_ts,
            now,
        ) {
            return Ok(HeadRecordOutcome::RotationDue);
        }

        // First write ever, with no prior committed file to recover a base
        // from (spec §3): seed from this record's own offset rather than
        // leaving the -1 sentinel to be added into at commit time.
        if self.offset < 0 {
            self.offset = record.offset;
        }

        let encoded = self.partitioner.encode_partition(&record);
        let projected = self
            .compatibility
            .project(record.clone(), current_schema.as_ref())?;
        let partitioned_path = self
            .partitioner
            .generate_partitioned_path(&self.tp.topic, &encoded);

        let hive_args: Option<(&dyn HiveService, Option<&Schema>)> = if self.config.hive_integration
        {
            self.hive_service
                .as_deref()
                .map(|h| (h, current_schema.as_ref()))
        } else {
            None
        };

        let writer = self.registry.get_or_create(
            &encoded,
            &projected,
            &partitioned_path,
            self.provider.as_ref(),
            self.storage.as_ref(),
            &self.config.topics_dir,
            &mut self.hive_partitions,
            hive_args,
        )?;
        writer.write(&projected)?;

        self.start_offsets.entry(encoded.clone()).or_insert(record.offset);
        self.end_offsets.insert(encoded, record.offset);
        self.record_counter += 1;
        self.last_record_timestamp = current_ts;
        self.buffer.pop_front();

        Ok(HeadRecordOutcome::Wrote)
    }

    fn record_rotation_timestamp(&self, record: &Record, now: i64) -> i64 {
        match self.partitioner.supports_timestamp_extractor() {
            Some(extractor) if extractor.is_wall_clock() => now,
            Some(extractor) => extractor.extract(record),
            None => record.timestamp,
        }
    }

    fn current_rotation_timestamp(&self, now: i64) -> i64 {
        if self.is_wall_clock {
            now
        } else {
            self.last_record_timestamp
        }
    }

    fn do_should_rotate(&mut self, now: i64) -> Result<()> {
        let trigger_ts = match self.buffer.front() {
            Some(record) => self.record_rotation_timestamp(&record.clone(), now),
            None => self.current_rotation_timestamp(now),
        };
        self.rotation_timers
            .refresh(&self.config.rotation, trigger_ts, now);
        self.registry.close_all()
    }

    fn do_wal_append(&mut self) -> Result<()> {
        let entries: Vec<WalEntry<'_>> = self
            .registry
            .temp_files()
            .iter()
            .filter_map(|(encoded, temp_path)| {
                self.start_offsets.get(encoded).map(|&start| WalEntry {
                    encoded_partition: encoded,
                    temp_path,
                    start_offset: start,
                    end_offset: *self
                        .end_offsets
                        .get(encoded)
                        .expect("end offset recorded whenever start offset is"),
                })
            })
            .collect();

        self.wal_coordinator.append_epoch(
            self.wal.as_mut(),
            &entries,
            &self.tp.topic,
            self.tp.partition,
            self.provider.extension(),
            self.config.zero_pad_width,
        )
    }

    fn do_commit(&mut self) -> Result<()> {
        // Reset at commit-start, not epoch-start (spec §9 Open Question (a)).
        self.wal_coordinator.reset();
        commit::commit_all(
            self.storage.as_ref(),
            self.partitioner.as_ref(),
            &mut self.registry,
            &mut self.start_offsets,
            &mut self.end_offsets,
            &self.config.topics_dir,
            &self.tp.topic,
            self.tp.partition,
            self.provider.extension(),
            self.config.zero_pad_width,
        )?;
        self.offset += self.record_counter as i64;
        self.record_counter = 0;
        Ok(())
    }

    /// Flush a partial batch once the buffer has drained, without
    /// transiting through `SHOULD_ROTATE` (spec §4.3 tail-flush note).
    fn maybe_tail_flush(&mut self, now: i64) -> Result<()> {
        if self.record_counter == 0 {
            return Ok(());
        }
        let current_ts = self.current_rotation_timestamp(now);
        if !should_rotate(
            &self.config.rotation,
            &self.rotation_timers,
            self.record_counter,
            current_ts,
            now,
        ) {
            return Ok(());
        }

        let result = (|| -> Result<()> {
            self.do_should_rotate(now)?;
            self.do_wal_append()?;
            self.do_commit()
        })();

        if let Err(e) = result {
            return self.abandon_rotation(now, e);
        }
        Ok(())
    }

    /// Discard in-progress temp files and close the WAL (spec §4.1/§7).
    /// Per-file discard errors are logged and swallowed so every partition
    /// gets a chance to close; the WAL close error, if any, is returned.
    pub fn close(&mut self) -> Result<()> {
        if let Err(e) = self.registry.close_all() {
            log::warn!("error closing temp writers for {:?}: {e}", self.tp);
        }
        let temp_paths: Vec<String> = self.registry.temp_files().values().cloned().collect();
        for temp_path in temp_paths {
            if let Err(e) = self.storage.delete(&temp_path) {
                log::warn!("failed to discard temp file {temp_path}: {e}");
            }
        }
        self.wal.close()
    }
}

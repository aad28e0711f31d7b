//! Writer registry (spec §3, §4.6): maps `encodedPartition` to an open
//! temp-file writer, and to the temp file's path (the TempFile table
//! survives writer close until that temp is committed or deleted).

use std::collections::{BTreeMap, BTreeSet};

use sink_common::Record;

use crate::error::Result;
use crate::interfaces::{HiveService, RecordWriter, RecordWriterProvider, Schema, Storage};
use crate::naming;

#[derive(Default)]
pub struct WriterRegistry {
    writers: BTreeMap<String, Box<dyn RecordWriter>>,
    temp_files: BTreeMap<String, String>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp_path(&self, encoded_partition: &str) -> Option<&str> {
        self.temp_files.get(encoded_partition).map(String::as_str)
    }

    pub fn temp_files(&self) -> &BTreeMap<String, String> {
        &self.temp_files
    }

    /// Return the open writer for `encoded_partition`, creating it (and
    /// its temp file, and announcing the partition to the catalog if
    /// this is its first appearance) if absent.
    #[allow(clippy::too_many_arguments)]
    pub fn get_or_create(
        &mut self,
        encoded_partition: &str,
        record: &Record,
        partitioned_path: &str,
        provider: &dyn RecordWriterProvider,
        storage: &dyn Storage,
        topics_dir: &str,
        hive_partitions: &mut BTreeSet<String>,
        hive: Option<(&dyn HiveService, Option<&Schema>)>,
    ) -> Result<&mut Box<dyn RecordWriter>> {
        if !self.writers.contains_key(encoded_partition) {
            let tmp_dir = naming::tmp_subdirectory(&format!("{topics_dir}/{partitioned_path}"));
            if !storage.exists(&tmp_dir)? {
                storage.create(&tmp_dir)?;
            }
            let temp_name = naming::temp_filename(
                &record.topic,
                record.partition,
                encoded_partition,
                provider.extension(),
            );
            let temp_path = format!("{tmp_dir}/{temp_name}");

            let writer = provider.get_record_writer(&temp_path, record)?;
            self.writers.insert(encoded_partition.to_string(), writer);
            self.temp_files
                .insert(encoded_partition.to_string(), temp_path);

            if let Some((hive_service, schema)) = hive
                && !hive_partitions.contains(encoded_partition)
            {
                hive_service.add_hive_partition(record, schema)?;
                hive_partitions.insert(encoded_partition.to_string());
            }
        }

        Ok(self.writers.get_mut(encoded_partition).expect("just inserted"))
    }

    /// Close every open writer, in deterministic (sorted-by-key) order
    /// (spec §9 Open Question (c)). Writers remain removed; their temp
    /// file paths stay in the TempFile table for the commit engine.
    pub fn close_all(&mut self) -> Result<()> {
        for (_, mut writer) in std::mem::take(&mut self.writers) {
            writer.close()?;
        }
        Ok(())
    }

    /// Drop a committed (or discarded) partition's temp-file entry.
    pub fn remove_temp(&mut self, encoded_partition: &str) {
        self.temp_files.remove(encoded_partition);
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty() && self.temp_files.is_empty()
    }
}

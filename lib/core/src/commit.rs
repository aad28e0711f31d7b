//! Commit engine (spec §4.5): promotes every temp file with a recorded
//! start offset into its committed name, after a complete WAL bracket
//! exists for the epoch.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::interfaces::{Partitioner, Storage};
use crate::naming;
use crate::registry::WriterRegistry;

/// One promoted file: its encoded partition and the committed path it
/// now lives at.
pub struct Committed {
    pub encoded_partition: String,
    pub path: String,
}

/// Promote every temp file in `registry` that has a recorded start
/// offset. Ordering: all renames for the epoch complete before the
/// caller advances `offset` (spec §4.5) — this function only performs
/// the renames and clears per-partition offset bookkeeping; the caller
/// is responsible for `offset += recordCounter; recordCounter = 0`
/// afterwards.
#[allow(clippy::too_many_arguments)]
pub fn commit_all(
    storage: &dyn Storage,
    partitioner: &dyn Partitioner,
    registry: &mut WriterRegistry,
    start_offsets: &mut BTreeMap<String, i64>,
    end_offsets: &mut BTreeMap<String, i64>,
    topics_dir: &str,
    topic: &str,
    partition: i32,
    extension: &str,
    zero_pad_width: usize,
) -> Result<Vec<Committed>> {
    let mut committed = Vec::new();

    // BTreeMap iteration is already sorted by key (spec §9 Open Question (c)).
    let temp_files: Vec<(String, String)> = registry
        .temp_files()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (encoded_partition, temp_path) in &temp_files {
        let Some(&start) = start_offsets.get(encoded_partition) else {
            continue;
        };
        let end = *end_offsets
            .get(encoded_partition)
            .expect("end offset recorded whenever start offset is (spec §3 invariant)");

        let partitioned_path = partitioner.generate_partitioned_path(topic, encoded_partition);
        let dir = format!("{topics_dir}/{partitioned_path}");
        if !storage.exists(&dir)? {
            storage.create(&dir)?;
        }

        let committed_name =
            naming::committed_filename(topic, partition, start, end, extension, zero_pad_width);
        let committed_path = format!("{dir}/{committed_name}");

        storage.commit(temp_path, &committed_path)?;
        committed.push(Committed {
            encoded_partition: encoded_partition.clone(),
            path: committed_path,
        });
    }

    for entry in &committed {
        start_offsets.remove(&entry.encoded_partition);
        end_offsets.remove(&entry.encoded_partition);
        registry.remove_temp(&entry.encoded_partition);
    }

    Ok(committed)
}

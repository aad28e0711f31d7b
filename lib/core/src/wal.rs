//! WAL coordination (spec §4.4): wraps `Wal::append` with a begin/end
//! marker bracket around one rotation epoch's rename entries.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::interfaces::{Wal, WAL_BEGIN_MARKER, WAL_END_MARKER};
use crate::naming;

/// One rename the WAL should record: `encoded_partition`'s temp file
/// promotes to the committed name built from `(topic, partition,
/// start_offset, end_offset)`.
pub struct WalEntry<'a> {
    pub encoded_partition: &'a str,
    pub temp_path: &'a str,
    pub start_offset: i64,
    pub end_offset: i64,
}

#[derive(Default)]
pub struct WalCoordinator {
    appended: BTreeSet<String>,
}

impl WalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appended(&self) -> &BTreeSet<String> {
        &self.appended
    }

    /// Reset at commit-start (spec §9 Open Question (a)): a retry of a
    /// partially-progressed commit does NOT consult `appended` to skip
    /// already-written entries — idempotence is left to `Wal::apply`'s
    /// replay, not to this set.
    pub fn reset(&mut self) {
        self.appended.clear();
    }

    /// Append the begin marker, one rename entry per `WalEntry`, and the
    /// end marker, skipping any already in the appended set (spec §4.4).
    #[allow(clippy::too_many_arguments)]
    pub fn append_epoch(
        &mut self,
        wal: &mut dyn Wal,
        entries: &[WalEntry<'_>],
        topic: &str,
        partition: i32,
        extension: &str,
        zero_pad_width: usize,
    ) -> Result<()> {
        if !self.appended.contains(WAL_BEGIN_MARKER) {
            wal.append(WAL_BEGIN_MARKER, "")?;
            self.appended.insert(WAL_BEGIN_MARKER.to_string());
        }

        for entry in entries {
            if self.appended.contains(entry.temp_path) {
                continue;
            }
            let committed = naming::committed_filename(
                topic,
                partition,
                entry.start_offset,
                entry.end_offset,
                extension,
                zero_pad_width,
            );
            wal.append(entry.temp_path, &committed)?;
            self.appended.insert(entry.temp_path.to_string());
        }

        if !self.appended.contains(WAL_END_MARKER) {
            wal.append(WAL_END_MARKER, "")?;
            self.appended.insert(WAL_END_MARKER.to_string());
        }

        Ok(())
    }

    /// Invariant of spec §8: `appended ⊇ {begin, end}` once the epoch's
    /// bracket is fully written.
    pub fn has_complete_bracket(&self) -> bool {
        self.appended.contains(WAL_BEGIN_MARKER) && self.appended.contains(WAL_END_MARKER)
    }
}

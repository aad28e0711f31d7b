//! Committed/temp file naming and directory layout (spec §6).
//!
//! Committed files: `<topic>+<partition>+<startOffset>+<endOffset>.<ext>`,
//! offsets zero-padded to a configured width. Temp files live under a
//! parallel `+tmp` subtree so recovery can tell temp files apart from
//! committed ones by a fixed namespace token (spec §4.6).

pub const TMP_DIRECTORY: &str = "+tmp";

pub fn committed_filename(
    topic: &str,
    partition: i32,
    start_offset: i64,
    end_offset: i64,
    extension: &str,
    zero_pad_width: usize,
) -> String {
    format!(
        "{topic}+{partition}+{start:0pad$}+{end:0pad$}.{extension}",
        topic = topic,
        partition = partition,
        start = start_offset,
        end = end_offset,
        extension = extension.trim_start_matches('.'),
        pad = zero_pad_width,
    )
}

/// Deterministic temp-file name for one encoded partition within a
/// rotation epoch: unique per (topic, partition, encoded partition) since
/// at most one writer is open for a given encoded partition at a time.
pub fn temp_filename(topic: &str, partition: i32, encoded_partition: &str, extension: &str) -> String {
    format!(
        "{topic}+{partition}+{encoded_partition}.{extension}.tmp",
        extension = extension.trim_start_matches('.'),
    )
}

pub fn tmp_subdirectory(base_dir: &str) -> String {
    format!("{base_dir}/{TMP_DIRECTORY}")
}

/// Parse `endOffset` out of a committed filename, per the recovery scan
/// of spec §4.1 step 4. Returns `None` if the name doesn't match the
/// committed pattern.
pub fn parse_end_offset(filename: &str) -> Option<i64> {
    let stem = filename.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(filename);
    let parts: Vec<&str> = stem.split('+').collect();
    if parts.len() != 4 {
        return None;
    }
    parts[3].parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_filename_zero_pads_offsets() {
        let name = committed_filename("mytopic", 3, 100, 102, "avro", 20);
        assert_eq!(
            name,
            "mytopic+3+00000000000000000100+00000000000000000102.avro"
        );
    }

    #[test]
    fn parse_end_offset_roundtrips() {
        let name = committed_filename("t", 0, 5, 9, "json", 5);
        assert_eq!(parse_end_offset(&name), Some(9));
    }

    #[test]
    fn parse_end_offset_rejects_malformed_names() {
        assert_eq!(parse_end_offset("not-a-committed-file.json"), None);
    }
}

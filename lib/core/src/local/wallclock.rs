use sink_common::Record;

use crate::interfaces::TimestampExtractor;

/// The distinguished wall-clock extractor (spec §4.3/§9): `extract` is
/// never consulted because `is_wall_clock` tells callers to use `now()`
/// instead.
pub struct WallClockExtractor;

impl TimestampExtractor for WallClockExtractor {
    fn extract(&self, _record: &Record) -> i64 {
        0
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

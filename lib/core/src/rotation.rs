//! Rotation evaluator (spec §4.3): three independent predicates OR'd
//! together decide when the current temp files should be closed and
//! promoted.

use chrono::{TimeZone, Timelike};
use chrono_tz::Tz;

/// Configuration captured immutably at writer construction.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub flush_size: u64,
    /// 0 disables record-time rotation.
    pub rotate_interval_ms: i64,
    /// 0 disables scheduled (wall-clock, day-aligned) rotation.
    pub rotate_schedule_interval_ms: i64,
    pub timezone: Tz,
}

/// Mutable rotation timer state. `last_rotate`/`next_scheduled_rotate` are
/// optionals, never a zero sentinel (spec §9 nullable-optional redesign).
#[derive(Debug, Clone, Default)]
pub struct RotationTimers {
    pub last_rotate: Option<i64>,
    pub next_scheduled_rotate: Option<i64>,
}

impl RotationTimers {
    /// Wall-clock partitioners seed `last_rotate` at construction time
    /// (spec §4.3).
    pub fn seed_wall_clock(&mut self, now_millis: i64) {
        self.last_rotate = Some(now_millis);
    }

    /// Non-wall-clock partitioners seed `last_rotate` on the first write,
    /// to that record's timestamp (spec §4.3). A no-op once seeded.
    pub fn seed_on_first_write(&mut self, record_timestamp: i64) {
        if self.last_rotate.is_none() {
            self.last_rotate = Some(record_timestamp);
        }
    }

    /// Refresh timers on entry to `SHOULD_ROTATE` / on tail flush (spec
    /// §4.3: "Timers are refreshed only on entry to SHOULD_ROTATE and on
    /// tail flush"). `trigger_timestamp` (the current record's time, or
    /// `now` for a wall-clock partitioner) reseeds periodic rotation;
    /// `now_millis` — always the actual wall clock — reseeds the
    /// schedule, since scheduled rotation is wall-clock-based regardless
    /// of the partitioner.
    pub fn refresh(&mut self, config: &RotationConfig, trigger_timestamp: i64, now_millis: i64) {
        self.last_rotate = Some(trigger_timestamp);
        if config.rotate_schedule_interval_ms > 0 {
            self.next_scheduled_rotate = Some(next_scheduled_rotate(
                now_millis,
                config.rotate_schedule_interval_ms,
                config.timezone,
            ));
        }
    }

    /// Ensure `next_scheduled_rotate` is set before the first evaluation,
    /// without disturbing `last_rotate`.
    pub fn ensure_scheduled(&mut self, config: &RotationConfig, now_millis: i64) {
        if config.rotate_schedule_interval_ms > 0 && self.next_scheduled_rotate.is_none() {
            self.next_scheduled_rotate = Some(next_scheduled_rotate(
                now_millis,
                config.rotate_schedule_interval_ms,
                config.timezone,
            ));
        }
    }
}

/// The three rotation predicates, OR'd (spec §4.3). `record_counter` is
/// the size-rotation count; `current_timestamp` is `now()` for a
/// wall-clock partitioner or the extractor's timestamp on the current
/// record otherwise.
pub fn should_rotate(
    config: &RotationConfig,
    timers: &RotationTimers,
    record_counter: u64,
    current_timestamp: i64,
    now_millis: i64,
) -> bool {
    let size_due = record_counter >= config.flush_size && config.flush_size > 0;

    // Open Question (b): preserved as raw subtraction, no clamping —
    // a timestamp earlier than last_rotate can suppress this predicate
    // for longer than rotate_interval_ms, matching the source.
    let periodic_due = config.rotate_interval_ms > 0
        && timers
            .last_rotate
            .is_some_and(|last| current_timestamp - last >= config.rotate_interval_ms);

    let scheduled_due = config.rotate_schedule_interval_ms > 0
        && timers
            .next_scheduled_rotate
            .is_some_and(|next| now_millis >= next);

    size_due || periodic_due || scheduled_due
}

/// Align `now` forward to the next multiple of `interval_ms` measured
/// from the start of `now`'s calendar day in `tz`, so scheduled rotation
/// times are fixed within each day rather than drifting (spec §4.3).
fn next_scheduled_rotate(now_millis: i64, interval_ms: i64, tz: Tz) -> i64 {
    let dt = tz.timestamp_millis_opt(now_millis).single().unwrap_or_else(|| {
        // Fall back to the earliest valid interpretation on an ambiguous/
        // nonexistent local time rather than panicking.
        tz.timestamp_millis_opt(now_millis)
            .earliest()
            .unwrap_or_else(|| tz.timestamp_millis_opt(0).unwrap())
    });
    let day_start = dt
        .with_hour(0)
        .and_then(|d| d.with_minute(0))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt);

    let elapsed = now_millis - day_start.timestamp_millis();
    let next_slot = (elapsed / interval_ms + 1) * interval_ms;
    day_start.timestamp_millis() + next_slot
}

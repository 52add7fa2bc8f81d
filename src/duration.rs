//! Task duration policy.
//!
//! Maps a task's date and effort fields to a whole number of days. Total:
//! missing or inconsistent data degrades to the one-day minimum.

use crate::types::Task;

/// Default working hours in a day.
pub const DEFAULT_HOURS_PER_DAY: f64 = 8.0;

/// Seconds in one calendar day.
const SECONDS_PER_DAY: i64 = 86_400;

/// Upper bound on a single task's duration (about 10,000 years).
pub const MAX_DURATION_DAYS: i64 = 3_652_500;

/// Duration in days using the default eight-hour day.
pub fn duration_days(task: &Task) -> i64 {
    duration_days_with(task, DEFAULT_HOURS_PER_DAY)
}

/// Duration in days.
///
/// 1. start and due both set: whole days between them, rounded up.
/// 2. otherwise effort set: effort hours / `hours_per_day`, rounded up.
/// 3. otherwise one day.
///
/// The result is clamped to `1..=MAX_DURATION_DAYS`.
pub fn duration_days_with(task: &Task, hours_per_day: f64) -> i64 {
    let days = if let (Some(start), Some(due)) = (task.start, task.due) {
        let seconds = (due - start).num_seconds();
        ceil_div(seconds, SECONDS_PER_DAY)
    } else if let Some(hours) = task.estimated_effort_hours {
        let per_day = if hours_per_day.is_finite() && hours_per_day > 0.0 {
            hours_per_day
        } else {
            DEFAULT_HOURS_PER_DAY
        };
        let days = (hours / per_day).ceil();
        if !days.is_finite() {
            1
        } else if days >= MAX_DURATION_DAYS as f64 {
            MAX_DURATION_DAYS
        } else {
            days as i64
        }
    } else {
        1
    };

    days.clamp(1, MAX_DURATION_DAYS)
}

/// Integer division rounding toward positive infinity.
fn ceil_div(n: i64, d: i64) -> i64 {
    let q = n / d;
    if n % d > 0 { q + 1 } else { q }
}

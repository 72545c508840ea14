//! The stale-name calculator: which bucket names have aged out of a policy's
//! retention window at a given instant.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone};

use super::Policy;
use super::bucket::snapshot_name;

/// How many retention windows back the stale scan reaches. Buckets older than
/// `LOOKBACK_MULTIPLIER * window` are assumed pruned by an earlier cycle and
/// left alone, which keeps every cycle O(keep_count) no matter how long the
/// policy has been running.
pub const LOOKBACK_MULTIPLIER: u32 = 4;

/// Names of every snapshot old enough to prune at `reference`.
///
/// The scan steps one `time_unit` at a time, starting one unit past the
/// retention edge (`reference - window`) and stopping at
/// `reference - LOOKBACK_MULTIPLIER * window`, so it yields exactly
/// `(LOOKBACK_MULTIPLIER - 1) * keep_count` names, each strictly older than
/// the edge. The bucket at exactly the edge is preserved, as is the bucket
/// `reference` itself falls in. Steps landing before the earliest instant
/// the calendar can represent have no bucket to name and are skipped.
/// Pure: a fixed policy and reference always produce the same set, and a
/// cycle that was skipped leaves names the next cycle's scan still covers.
pub fn stale_snapshot_names<Tz: TimeZone>(
    policy: &Policy,
    reference: &DateTime<Tz>,
) -> HashSet<String> {
    // Policy::new bounds the step count to u32 and the lookback span to i64
    // milliseconds; whether an instant that far back is representable still
    // depends on `reference`, so the subtraction stays checked.
    let unit = millis_i64(policy.time_unit.as_millis());
    let window = millis_i64(policy.window_millis());
    let steps = (LOOKBACK_MULTIPLIER - 1) * policy.keep_count;

    let mut names = HashSet::with_capacity(steps as usize);
    for step in 1..=steps {
        let age = Duration::milliseconds(window + i64::from(step) * unit);
        if let Some(at) = reference.clone().checked_sub_signed(age) {
            names.insert(snapshot_name(policy, &at));
        }
    }
    names
}

fn millis_i64(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

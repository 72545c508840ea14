//! Calendar-bucket naming. A snapshot's name is its bucket, so retention can
//! reason about age with nothing but string equality.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

use super::{Policy, TimeUnit};

/// Label of the calendar bucket `at` falls into, at `unit` granularity.
///
/// Fields are `-`-joined, most significant first, unpadded: always
/// `year-month-day` (1-based month and day), plus the hour once the unit is
/// finer than a day, the minute once finer than an hour, and the second once
/// finer than a minute. Instants in the same bucket always agree; instants in
/// different buckets never collide at the chosen precision.
pub fn bucket_label<Tz: TimeZone>(at: &DateTime<Tz>, unit: TimeUnit) -> String {
    let mut fields = vec![
        at.year().to_string(),
        at.month().to_string(),
        at.day().to_string(),
    ];
    if unit < TimeUnit::DAY {
        fields.push(at.hour().to_string());
    }
    if unit < TimeUnit::HOUR {
        fields.push(at.minute().to_string());
    }
    if unit < TimeUnit::MINUTE {
        fields.push(at.second().to_string());
    }
    fields.join("-")
}

/// Full snapshot name for `policy` at instant `at`:
/// `<resource_name>-<bucket label>`.
pub fn snapshot_name<Tz: TimeZone>(policy: &Policy, at: &DateTime<Tz>) -> String {
    format!(
        "{}-{}",
        policy.resource_name,
        bucket_label(at, policy.time_unit)
    )
}

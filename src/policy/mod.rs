//! Retention policy core: the policy value object, calendar-bucket naming,
//! the stale-name calculator, and the cycle runner.

mod bucket;
mod retention;
mod runner;

pub use bucket::{bucket_label, snapshot_name};
pub use retention::{LOOKBACK_MULTIPLIER, stale_snapshot_names};
pub use runner::{DeleteFailure, LIST_MARGIN, PolicyRunner, PruneOutcome, RunOutcome};

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Retention periods preserved when the caller does not say otherwise.
pub const DEFAULT_KEEP_COUNT: u32 = 7;

// ─── Time units ──────────────────────────────────────────────────────────────

/// Snapshot-naming granularity and retention step, in milliseconds.
///
/// Ordering follows duration: `TimeUnit::MINUTE < TimeUnit::DAY`. Custom
/// granularities are allowed; anything below [`TimeUnit::SECOND`] still names
/// buckets at second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeUnit(u64);

impl TimeUnit {
    pub const SECOND: TimeUnit = TimeUnit(1_000);
    pub const MINUTE: TimeUnit = TimeUnit(60 * 1_000);
    pub const HOUR: TimeUnit = TimeUnit(60 * 60 * 1_000);
    pub const DAY: TimeUnit = TimeUnit(24 * 60 * 60 * 1_000);

    /// A custom granularity. Returns `None` for zero, which would make the
    /// stale scan step in place forever.
    pub const fn from_millis(ms: u64) -> Option<TimeUnit> {
        if ms == 0 { None } else { Some(TimeUnit(ms)) }
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimeUnit::SECOND => f.write_str("second"),
            TimeUnit::MINUTE => f.write_str("minute"),
            TimeUnit::HOUR => f.write_str("hour"),
            TimeUnit::DAY => f.write_str("day"),
            TimeUnit(ms) => write!(f, "{ms}ms"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ConfigError;

    /// Accepts the named units (singular or plural) or a raw positive
    /// millisecond count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" => Ok(TimeUnit::SECOND),
            "minute" | "minutes" => Ok(TimeUnit::MINUTE),
            "hour" | "hours" => Ok(TimeUnit::HOUR),
            "day" | "days" => Ok(TimeUnit::DAY),
            raw => raw
                .parse::<u64>()
                .ok()
                .and_then(TimeUnit::from_millis)
                .ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "time unit must be second|minute|hour|day or a positive millisecond count, got '{raw}'"
                    ))
                }),
        }
    }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Backup policy for one remote resource.
///
/// Immutable once constructed; each CLI invocation builds its own value, so
/// nothing here leans on ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Label prefixed to every snapshot name this policy creates.
    pub resource_name: String,
    /// Provider-side id of the resource being snapshotted.
    pub resource_id: String,
    /// How many retention periods to preserve.
    pub keep_count: u32,
    /// Length of one retention period.
    pub time_unit: TimeUnit,
}

impl Policy {
    /// Validates the retention invariants and returns the policy, or the
    /// specific violation.
    pub fn new(
        resource_name: impl Into<String>,
        resource_id: impl Into<String>,
        keep_count: u32,
        time_unit: TimeUnit,
    ) -> Result<Policy, ConfigError> {
        let resource_name = resource_name.into();
        let resource_id = resource_id.into();

        if resource_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "resource name must not be empty".into(),
            ));
        }
        if resource_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "resource id must not be empty".into(),
            ));
        }
        if keep_count == 0 {
            return Err(ConfigError::Validation(
                "keep count must be at least 1".into(),
            ));
        }

        // The stale scan walks one bucket per time unit across the lookback;
        // that step count must stay within u32 arithmetic.
        if LOOKBACK_MULTIPLIER.checked_mul(keep_count).is_none() {
            return Err(ConfigError::Validation(
                "keep count is too large for the stale scan".into(),
            ));
        }

        // The stale scan reaches back LOOKBACK_MULTIPLIER windows; that span
        // must stay addressable in signed millisecond arithmetic.
        let lookback = time_unit
            .as_millis()
            .checked_mul(u64::from(keep_count))
            .and_then(|window| window.checked_mul(u64::from(LOOKBACK_MULTIPLIER)))
            .and_then(|ms| i64::try_from(ms).ok());
        if lookback.is_none() {
            return Err(ConfigError::Validation(
                "keep count times time unit overflows the lookback window".into(),
            ));
        }

        Ok(Policy {
            resource_name,
            resource_id,
            keep_count,
            time_unit,
        })
    }

    /// Span that must be preserved: `keep_count * time_unit`, in milliseconds.
    pub fn window_millis(&self) -> u64 {
        self.time_unit.as_millis() * u64::from(self.keep_count)
    }
}

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default
)]

pub mod app;
pub mod cli;
pub mod error;
pub mod policy;
pub mod service;

pub use error::{BackupError, ConfigError, Result, ServiceError};
pub use policy::{
    DEFAULT_KEEP_COUNT, DeleteFailure, LIST_MARGIN, LOOKBACK_MULTIPLIER, Policy, PolicyRunner,
    PruneOutcome, RunOutcome, TimeUnit, bucket_label, snapshot_name, stale_snapshot_names,
};
pub use service::{DigitalOceanClient, Snapshot, SnapshotId, SnapshotService, resolve_token};

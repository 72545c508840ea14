use std::fmt;

use async_trait::async_trait;

use crate::error::ServiceError;

/// Opaque identifier the remote service assigns to a snapshot, or to the
/// operation producing one. Some endpoints report numbers, others strings;
/// both normalize to the string form and nothing downstream does arithmetic
/// on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A snapshot as the remote service reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub name: String,
}

/// Contract of the remote snapshot-management service the policy engine
/// drives.
///
/// Implementations own transport concerns, timeouts included; the policy
/// core never retries or cancels on its own.
#[async_trait]
pub trait SnapshotService: Send + Sync {
    /// Requests a new snapshot of `resource_id` under `name`, returning the
    /// service's receipt id. Any failure (auth, quota, missing resource,
    /// network) comes back as a [`ServiceError`].
    async fn create_snapshot(
        &self,
        resource_id: &str,
        name: &str,
    ) -> Result<SnapshotId, ServiceError>;

    /// One page of the snapshots taken of `resource_id`.
    async fn list_snapshots(
        &self,
        resource_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Snapshot>, ServiceError>;

    /// Deletes one snapshot. Failures are independent per id.
    async fn delete_snapshot(&self, id: &SnapshotId) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_id_displays_its_raw_form() {
        assert_eq!(SnapshotId::new("6372321").to_string(), "6372321");
        assert_eq!(SnapshotId::new("vol-a1b2").as_str(), "vol-a1b2");
    }

    #[test]
    fn snapshot_ids_compare_by_value() {
        assert_eq!(SnapshotId::new("42"), SnapshotId::new(String::from("42")));
        assert_ne!(SnapshotId::new("42"), SnapshotId::new("43"));
    }
}

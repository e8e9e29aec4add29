//! Error types for the encoding orchestrator.

use reef_erasure::CodingError;
use reef_net::NetError;
use reef_store::StoreError;
use reef_types::{GroupId, VolumeId};

/// Errors that abort a global-encoding job and trigger rollback.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The local storage gateway failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A peer region or the metadata service failed.
    #[error("network error: {0}")]
    Net(#[from] NetError),

    /// The erasure encoder or the XOR fold failed.
    #[error("coding error: {0}")]
    Coding(#[from] CodingError),

    /// A spawned pipeline task panicked.
    #[error("pipeline task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The primary's encoding group is not in the cluster map.
    #[error("unknown encoding group {0}")]
    UnknownGroup(GroupId),

    /// The group's member count does not match the configured shard count.
    #[error("group {group} has {volumes} volumes, expected {expected} for {local_shards} local shards")]
    BadGroupShape {
        /// The misconfigured group.
        group: GroupId,
        /// Member volumes found in the cluster map.
        volumes: usize,
        /// Expected member count (`local_shards + 1`).
        expected: usize,
        /// Configured shards per group.
        local_shards: usize,
    },

    /// The token's primary volume is not the group leader.
    #[error("group {group} leader is {found}, token expects {expected}")]
    LeaderMismatch {
        /// The primary's encoding group.
        group: GroupId,
        /// The volume the token names as primary.
        expected: VolumeId,
        /// The leader recorded in the cluster map.
        found: VolumeId,
    },
}

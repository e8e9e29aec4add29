//! Chunk lifecycle state machine.
//!
//! Each region keeps the authoritative status of its own chunks; peers
//! mutate it only through the status RPC, which lands here. The
//! `GloballyEncoding` status doubles as a claim: the marking job's id is
//! recorded, a re-mark by the same job is a no-op, and any other job is
//! rejected. That claim is the sole guard against two jobs consuming the
//! same shard.

use std::collections::HashMap;
use std::sync::RwLock;

use reef_types::{ChunkStatus, GroupId};
use tracing::debug;

/// Errors from a requested status transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    /// The chunk is held by another encoding job.
    #[error("chunk {chunk_id} already claimed by another job")]
    AlreadyClaimed {
        /// The contested chunk.
        chunk_id: String,
    },

    /// The transition is not part of the lifecycle.
    #[error("illegal status transition {from} -> {to} for chunk {chunk_id}")]
    IllegalTransition {
        /// The chunk whose transition was refused.
        chunk_id: String,
        /// Current status.
        from: ChunkStatus,
        /// Requested status.
        to: ChunkStatus,
    },
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    status: ChunkStatus,
    claim: Option<u64>,
}

/// In-memory chunk status registry for one region.
#[derive(Debug, Default)]
pub struct StatusBoard {
    entries: RwLock<HashMap<(GroupId, String), Entry>>,
}

/// Whether `from -> to` is a legal lifecycle edge. Faulty is reachable from
/// everywhere; no status leaves it.
fn allowed(from: ChunkStatus, to: ChunkStatus) -> bool {
    use ChunkStatus::*;
    matches!(
        (from, to),
        (Writing, LocallyEncoded)
            | (Writing, Temporary)
            | (Temporary, LocallyEncoded)
            | (LocallyEncoded, GloballyEncoding)
            | (GloballyEncoding, GloballyEncoded)
            | (GloballyEncoding, LocallyEncoded)
            // Rollback of a job that failed after promoting its shards.
            | (GloballyEncoded, LocallyEncoded)
            | (LocallyEncoded, Recovering)
            | (GloballyEncoded, Recovering)
            | (Recovering, LocallyEncoded)
            | (Recovering, GloballyEncoded)
            | (_, Faulty)
    )
}

impl StatusBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of a chunk, if known.
    pub fn get(&self, group: GroupId, chunk_id: &str) -> Option<ChunkStatus> {
        let entries = self.entries.read().expect("lock poisoned");
        entries
            .get(&(group, chunk_id.to_string()))
            .map(|e| e.status)
    }

    /// Apply a status transition.
    ///
    /// Re-applying the current status is a no-op. A chunk not yet on the
    /// board is created with the requested status. `job` identifies the
    /// caller when entering `GloballyEncoding` and when releasing that
    /// claim (to `LocallyEncoded` or `GloballyEncoded`); a mismatched job
    /// is rejected and the claim kept.
    pub fn set(
        &self,
        group: GroupId,
        chunk_id: &str,
        status: ChunkStatus,
        job: Option<u64>,
    ) -> Result<(), StatusError> {
        use ChunkStatus::*;

        let mut entries = self.entries.write().expect("lock poisoned");
        let key = (group, chunk_id.to_string());
        let Some(entry) = entries.get_mut(&key) else {
            entries.insert(
                key,
                Entry {
                    status,
                    claim: (status == GloballyEncoding).then_some(job).flatten(),
                },
            );
            debug!(%group, chunk_id, %status, "registered chunk status");
            return Ok(());
        };

        // Entering, re-asserting, or releasing a claim requires the holder.
        let touches_claim = entry.status == GloballyEncoding
            && matches!(status, GloballyEncoding | GloballyEncoded | LocallyEncoded);
        if touches_claim && entry.claim.is_some() && entry.claim != job {
            return Err(StatusError::AlreadyClaimed {
                chunk_id: chunk_id.to_string(),
            });
        }

        if entry.status == status {
            return Ok(());
        }
        if !allowed(entry.status, status) {
            return Err(StatusError::IllegalTransition {
                chunk_id: chunk_id.to_string(),
                from: entry.status,
                to: status,
            });
        }

        debug!(%group, chunk_id, from = %entry.status, to = %status, "chunk status transition");
        entry.status = status;
        entry.claim = (status == GloballyEncoding).then_some(job).flatten();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EG: GroupId = GroupId(1);

    #[test]
    fn test_claim_remark_same_job_is_noop() {
        let board = StatusBoard::new();
        board.set(EG, "c1", ChunkStatus::LocallyEncoded, None).unwrap();
        board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(7))
            .unwrap();
        board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(7))
            .unwrap();
        assert_eq!(board.get(EG, "c1"), Some(ChunkStatus::GloballyEncoding));
    }

    #[test]
    fn test_claim_by_other_job_rejected() {
        let board = StatusBoard::new();
        board.set(EG, "c1", ChunkStatus::LocallyEncoded, None).unwrap();
        board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(7))
            .unwrap();
        let err = board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(8))
            .unwrap_err();
        assert_eq!(
            err,
            StatusError::AlreadyClaimed {
                chunk_id: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_release_requires_holder() {
        let board = StatusBoard::new();
        board.set(EG, "c1", ChunkStatus::LocallyEncoded, None).unwrap();
        board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(7))
            .unwrap();
        // A rival rollback cannot free the chunk.
        assert!(board
            .set(EG, "c1", ChunkStatus::LocallyEncoded, Some(8))
            .is_err());
        // The holder can, and the chunk becomes claimable again.
        board
            .set(EG, "c1", ChunkStatus::LocallyEncoded, Some(7))
            .unwrap();
        board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(9))
            .unwrap();
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let board = StatusBoard::new();
        board.set(EG, "c1", ChunkStatus::GloballyEncoded, None).unwrap();
        let err = board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(1))
            .unwrap_err();
        assert!(matches!(err, StatusError::IllegalTransition { .. }));
    }

    #[test]
    fn test_faulty_reachable_from_anywhere() {
        let board = StatusBoard::new();
        for (chunk, status) in [
            ("w", ChunkStatus::Writing),
            ("l", ChunkStatus::LocallyEncoded),
            ("e", ChunkStatus::GloballyEncoding),
            ("g", ChunkStatus::GloballyEncoded),
            ("r", ChunkStatus::Recovering),
        ] {
            board.set(EG, chunk, status, Some(1)).unwrap();
            board.set(EG, chunk, ChunkStatus::Faulty, None).unwrap();
            assert_eq!(board.get(EG, chunk), Some(ChunkStatus::Faulty));
        }
    }

    #[test]
    fn test_late_rollback_demotes_promoted_shard() {
        let board = StatusBoard::new();
        board.set(EG, "c1", ChunkStatus::LocallyEncoded, None).unwrap();
        board
            .set(EG, "c1", ChunkStatus::GloballyEncoding, Some(7))
            .unwrap();
        board
            .set(EG, "c1", ChunkStatus::GloballyEncoded, Some(7))
            .unwrap();
        board
            .set(EG, "c1", ChunkStatus::LocallyEncoded, Some(7))
            .unwrap();
        assert_eq!(board.get(EG, "c1"), Some(ChunkStatus::LocallyEncoded));
    }

    #[test]
    fn test_recovery_cycle() {
        let board = StatusBoard::new();
        board.set(EG, "c1", ChunkStatus::GloballyEncoded, None).unwrap();
        board.set(EG, "c1", ChunkStatus::Recovering, None).unwrap();
        board.set(EG, "c1", ChunkStatus::GloballyEncoded, None).unwrap();
    }
}

//! Compensation ledger for in-flight encoding jobs.

use reef_store::{StoreGateway, StoreRequest};
use reef_types::{GroupId, VolumeId};
use tracing::{debug, warn};

/// Locator of one chunk recorded for compensating deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    /// Volume holding the chunk.
    pub volume: VolumeId,
    /// Encoding group of the chunk.
    pub encoding_group: GroupId,
    /// Full chunk name, with its lifecycle prefix.
    pub chunk: String,
}

/// Ordered ledger of temporary chunks created by a job.
///
/// Every chunk is recorded *before* its creation is attempted, so a chunk
/// can never exist without a ledger entry. On rollback the entries are
/// deleted in recording order; deletion is idempotent, so entries whose
/// creation never happened are harmless.
#[derive(Debug, Default)]
pub struct UndoLog {
    entries: Vec<ChunkRef>,
}

impl UndoLog {
    /// Record a chunk for deletion on rollback.
    pub fn record(&mut self, volume: VolumeId, encoding_group: GroupId, chunk: impl Into<String>) {
        self.entries.push(ChunkRef {
            volume,
            encoding_group,
            chunk: chunk.into(),
        });
    }

    /// Drop the entry for a chunk that was already deleted in-pipeline.
    pub fn forget(&mut self, volume: VolumeId, chunk: &str) {
        self.entries
            .retain(|e| !(e.volume == volume && e.chunk == chunk));
    }

    /// Follow a chunk rename, keeping the entry pointed at the live name.
    pub fn follow_rename(&mut self, volume: VolumeId, src: &str, dest: &str) {
        for entry in &mut self.entries {
            if entry.volume == volume && entry.chunk == src {
                entry.chunk = dest.to_string();
            }
        }
    }

    /// Number of chunks currently recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delete every recorded chunk, in recording order. Best-effort: a
    /// failed deletion is logged and the sweep continues.
    pub async fn run(self, gateway: &dyn StoreGateway) {
        for entry in self.entries {
            debug!(chunk = %entry.chunk, volume = %entry.volume, "rolling back chunk");
            let req = StoreRequest::delete_real(entry.volume, entry.encoding_group, &entry.chunk);
            let outcome = match gateway.push(req).await {
                Ok(ticket) => ticket.wait().await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                warn!(chunk = %entry.chunk, error = %e, "rollback deletion failed");
            }
        }
    }
}

//! Global-encoding pipeline core.
//!
//! This crate turns locally-protected chunks from three peer encoding
//! groups into cross-region global parity:
//!
//! - [`GlobalEncoder`] — the per-job orchestrator: claim, download,
//!   encode, compress, distribute, promote, report; compensating rollback
//!   on failure.
//! - [`UndoLog`] — the rollback ledger of temporary chunks.
//! - [`StatusBoard`] — the authoritative chunk lifecycle state machine a
//!   region exposes through its status RPC, including job claims.
//! - [`next_candidate`] — picks the next locally-encoded chunk on a volume.
//! - [`GroupView`] — encoding-group membership as seen from the cluster map.

mod candidate;
mod error;
mod group;
mod orchestrator;
mod status;
mod undo;


pub use candidate::next_candidate;
pub use error::EncodeError;
pub use group::{GroupMember, GroupView, StaticGroupView};
pub use orchestrator::GlobalEncoder;
pub use status::{StatusBoard, StatusError};
pub use undo::{ChunkRef, UndoLog};

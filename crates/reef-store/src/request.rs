//! Store request types.

use reef_types::{GroupId, VolumeId};

use crate::pipe::{PipeReader, PipeWriter};

/// Operations a gateway can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Partial read at an offset.
    Read,
    /// Stream an entire chunk to the request's output pipe.
    ReadAll,
    /// Partial write at an offset.
    Write,
    /// Create a chunk from the request's input pipe.
    WriteAll,
    /// Logical delete (mark only).
    Delete,
    /// Physical delete: remove the chunk from storage. Idempotent.
    DeleteReal,
}

/// An asynchronous operation against the local storage gateway.
///
/// Requests that open a stream (`ReadAll`/`WriteAll`) must eventually be
/// completed by the gateway, or the paired stream end closed with an error —
/// otherwise the peer task blocks forever.
#[derive(Debug)]
pub struct StoreRequest {
    /// Operation kind.
    pub op: StoreOp,
    /// Target volume.
    pub volume: VolumeId,
    /// Target encoding group.
    pub encoding_group: GroupId,
    /// Target chunk name (with its lifecycle prefix).
    pub chunk: String,
    /// Data source for write operations.
    pub input: Option<PipeReader>,
    /// Data sink for read operations.
    pub output: Option<PipeWriter>,
}

impl StoreRequest {
    /// Build a `WriteAll` request creating `chunk` from `input`.
    pub fn write_all(
        volume: VolumeId,
        encoding_group: GroupId,
        chunk: impl Into<String>,
        input: PipeReader,
    ) -> Self {
        Self {
            op: StoreOp::WriteAll,
            volume,
            encoding_group,
            chunk: chunk.into(),
            input: Some(input),
            output: None,
        }
    }

    /// Build a `ReadAll` request streaming `chunk` into `output`.
    pub fn read_all(
        volume: VolumeId,
        encoding_group: GroupId,
        chunk: impl Into<String>,
        output: PipeWriter,
    ) -> Self {
        Self {
            op: StoreOp::ReadAll,
            volume,
            encoding_group,
            chunk: chunk.into(),
            input: None,
            output: Some(output),
        }
    }

    /// Build a `DeleteReal` request removing `chunk`.
    pub fn delete_real(volume: VolumeId, encoding_group: GroupId, chunk: impl Into<String>) -> Self {
        Self {
            op: StoreOp::DeleteReal,
            volume,
            encoding_group,
            chunk: chunk.into(),
            input: None,
            output: None,
        }
    }
}

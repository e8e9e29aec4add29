//! Error types for storage gateway operations.

use crate::pipe::PipeError;
use crate::request::StoreOp;

/// Errors that can occur while the gateway processes a store request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested chunk does not exist.
    #[error("chunk not found: {0}")]
    NotFound(String),

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request's paired stream failed or closed early.
    #[error("stream error: {0}")]
    Pipe(#[from] PipeError),

    /// The backend does not implement this operation.
    #[error("unsupported store operation: {0:?}")]
    Unsupported(StoreOp),

    /// The operation requires an input or output stream that was not supplied.
    #[error("store request for {0:?} is missing its stream end")]
    MissingStream(StoreOp),

    /// The gateway dropped the request without completing it.
    #[error("gateway closed before completing the request")]
    GatewayClosed,
}

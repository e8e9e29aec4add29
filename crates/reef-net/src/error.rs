//! Error types for network operations.

use reef_store::PipeError;

/// Errors that can occur talking to peer regions or the metadata service.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The HTTP client failed (dial, timeout, broken transfer).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status code.
    #[error("{operation} rejected by {url}: status {status}")]
    Rejected {
        /// What was being attempted.
        operation: &'static str,
        /// The request URL.
        url: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// A shard is already claimed by another encoding job.
    #[error("chunk {chunk_id} already claimed by another job")]
    AlreadyClaimed {
        /// The contested chunk.
        chunk_id: String,
    },

    /// The local pipe feeding or draining a transfer failed.
    #[error("stream error: {0}")]
    Pipe(#[from] PipeError),

    /// A request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Error types for erasure coding operations.

use reef_store::PipeError;

/// Errors that can occur during streaming encode, decode, or XOR folding.
#[derive(Debug, thiserror::Error)]
pub enum CodingError {
    /// The Reed-Solomon library returned an error.
    #[error("reed-solomon error: {0}")]
    ReedSolomon(#[from] reed_solomon_simd::Error),

    /// A connected pipe failed or closed early.
    #[error("stream error: {0}")]
    Pipe(#[from] PipeError),

    /// One input stream ended before its siblings.
    #[error("stream {stream} delivered {got} bytes where {expected} were expected")]
    ShortStream {
        /// Index of the offending stream.
        stream: usize,
        /// Bytes the lockstep round expected.
        expected: usize,
        /// Bytes actually delivered.
        got: usize,
    },

    /// Not enough shards were provided for decoding.
    #[error("not enough shards: need {needed}, got {got}")]
    NotEnoughShards {
        /// Minimum shards required (k).
        needed: usize,
        /// Shards actually provided.
        got: usize,
    },

    /// The stream counts don't match the coding geometry.
    #[error("bad coding geometry: {data} data streams, {parity} parity streams")]
    BadGeometry {
        /// Data stream count supplied.
        data: usize,
        /// Parity stream count supplied.
        parity: usize,
    },
}

//! Streaming erasure coding for the global-encoding pipeline.
//!
//! This crate provides:
//!
//! - [`stream_encode`] — consumes `k` data pipes and produces `m`
//!   Reed-Solomon parity pipes in lockstep 64 KiB blocks, never holding a
//!   full chunk in memory.
//! - [`decode`] — reconstructs data from any `k` of the `k + m` shards
//!   (recovery and tests).
//! - [`stream_xor`] — folds `n` equal-length byte streams into their
//!   byte-wise XOR, the compression step that turns per-shard parities into
//!   one transmittable object.
//!
//! Shard sizes are padded to even lengths internally to satisfy
//! `reed-solomon-simd`; callers never see the padding.

mod decoder;
mod error;
mod stream;
mod xor;

pub use decoder::decode;
pub use error::CodingError;
pub use stream::{stream_encode, ENCODE_BLOCK_SIZE};
pub use xor::{stream_xor, xor_into};

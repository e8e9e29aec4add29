//! Local storage gateway interface and backends.
//!
//! This crate defines how the encoding pipeline talks to chunk storage:
//!
//! - [`StoreGateway`] — the asynchronous gateway trait: push a
//!   [`StoreRequest`], wait on its [`StoreTicket`], rename chunks, and scan
//!   for un-encoded candidates.
//! - [`pipe`] — a capacity-1 byte-stream pair with close-with-error
//!   semantics, bounding memory to a handful of in-flight blocks per shard
//!   regardless of chunk size.
//! - [`MemoryGateway`] — in-memory backend for tests and memory-only nodes.
//! - [`FileGateway`] — file-per-chunk backend with atomic writes.

mod error;
mod file_gateway;
mod gateway;
mod memory_gateway;
mod pipe;
mod request;

pub use error::StoreError;
pub use file_gateway::FileGateway;
pub use gateway::{Completion, StoreGateway, StoreTicket};
pub use memory_gateway::MemoryGateway;
pub use pipe::{pipe, PipeError, PipeReader, PipeWriter};
pub use request::{StoreOp, StoreRequest};

/// Block size used when streaming chunk data through pipes.
pub const STREAM_BLOCK_SIZE: usize = 64 * 1024;

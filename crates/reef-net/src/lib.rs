//! Inter-region wire contract and service clients.
//!
//! This crate owns the HTTP protocol between regions and toward the
//! metadata service:
//!
//! - [`PeerClient`] — fetch locally-encoded shard fragments
//!   (`GET /chunk`), push finished global parity (`PUT /chunk`), and
//!   request chunk-status transitions at a shard's owning region
//!   (`POST /chunk/status`). [`HttpPeerClient`] is the reqwest-backed
//!   implementation with streaming bodies.
//! - [`MetaClient`] — report job outcomes and register finished jobs with
//!   the metadata service. [`HttpMetaClient`] speaks HTTP+JSON.
//!
//! Header names and chunk-status request/response bodies are part of the
//! wire contract and defined here in one place.

mod error;
mod meta;
mod peer;

pub use error::NetError;
pub use meta::{HttpMetaClient, MetaClient};
pub use peer::{HttpPeerClient, PeerClient, StatusChange};

/// Header naming the destination volume on `PUT /chunk`.
pub const HDR_VOLUME: &str = "Volume";
/// Header naming the encoding group on `GET`/`PUT /chunk`.
pub const HDR_ENCODING_GROUP: &str = "Encoding-Group";
/// Header naming the chunk (`L_<id>` on GET, `G_<id>` on PUT).
pub const HDR_CHUNK_NAME: &str = "Chunk-Name";
/// Header naming the shard fragment index on `GET /chunk`.
pub const HDR_SHARD_NUMBER: &str = "Shard-Number";

//! Shared types and identifiers for Reef.
//!
//! This crate defines the core vocabulary used across the Reef workspace:
//! identifiers ([`VolumeId`], [`GroupId`], [`Region`]), the global-encoding
//! job descriptor ([`EncodingToken`] and its [`Unencoded`] shard locators),
//! the chunk lifecycle ([`ChunkStatus`]), job outcomes ([`JobStatus`]),
//! encoding parameters ([`EncodeConfig`]), and the chunk naming convention
//! ([`name`]).

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod name;

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

/// Identifier of a volume (one disk-backed storage unit on a node).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
pub struct VolumeId(pub u32);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vol-{}", self.0)
    }
}

/// Identifier of an encoding group (a set of volumes sharing local parity).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, Default,
)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eg-{}", self.0)
    }
}

/// A region: the node (or site) that owns a set of chunks.
///
/// The `name` participates in temporary chunk names on disk, so it must be
/// stable for the lifetime of the region. The `endpoint` is the base URL of
/// the region's chunk-transfer HTTP API (e.g. `http://10.0.0.2:4830`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Stable human-readable region name.
    pub name: String,
    /// Base URL of the region's HTTP endpoint.
    pub endpoint: String,
}

// ---------------------------------------------------------------------------
// Encoding token
// ---------------------------------------------------------------------------

/// Locator of one un-encoded source shard participating in a job.
///
/// Immutable for the job's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unencoded {
    /// Region owning this shard.
    pub region: Region,
    /// Encoding group the shard belongs to at its owning region.
    pub encoding_group: GroupId,
    /// Bare chunk identifier (without any lifecycle prefix).
    pub chunk_id: String,
    /// Volume holding the shard locally at its owning region.
    pub volume: VolumeId,
}

/// Descriptor of one global-encoding job.
///
/// Names the three peer shards to combine and the primary destination where
/// this node materializes the resulting global parity. A token is created
/// once per job and never mutated; it is the unit of idempotency — after a
/// rollback, re-submitting the same token is safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingToken {
    /// Job identifier, used when reporting status to the metadata service.
    pub job_id: u64,
    /// First source shard.
    pub first: Unencoded,
    /// Second source shard.
    pub second: Unencoded,
    /// Third source shard.
    pub third: Unencoded,
    /// Destination for the resulting global parity.
    pub primary: Unencoded,
}

impl EncodingToken {
    /// The three source shards in processing order.
    pub fn sources(&self) -> [&Unencoded; 3] {
        [&self.first, &self.second, &self.third]
    }

    /// All four participating shards (sources plus primary).
    pub fn participants(&self) -> [&Unencoded; 4] {
        [&self.first, &self.second, &self.third, &self.primary]
    }
}

// ---------------------------------------------------------------------------
// Chunk lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a chunk, persisted at the chunk's owning region.
///
/// The single-letter form is the wire and on-disk representation; it also
/// prefixes chunk names (`L_<id>`, `G_<id>`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkStatus {
    /// Accepting appends.
    Writing,
    /// Local parity complete; a safe source for a global-encoding job.
    LocallyEncoded,
    /// Mid-transformation; never picked for recovery or re-encoding.
    Temporary,
    /// Being consumed by a global-encoding job (claimed).
    GloballyEncoding,
    /// Terminal success.
    GloballyEncoded,
    /// Under recovery.
    Recovering,
    /// Terminal failure; eligible for garbage collection.
    Faulty,
}

impl ChunkStatus {
    /// Single-letter wire form.
    pub fn letter(self) -> char {
        match self {
            ChunkStatus::Writing => 'W',
            ChunkStatus::LocallyEncoded => 'L',
            ChunkStatus::Temporary => 'T',
            ChunkStatus::GloballyEncoding => 'E',
            ChunkStatus::GloballyEncoded => 'G',
            ChunkStatus::Recovering => 'R',
            ChunkStatus::Faulty => 'F',
        }
    }

    /// Parse the single-letter wire form.
    pub fn from_letter(c: char) -> Result<Self, BadStatusLetter> {
        match c {
            'W' => Ok(ChunkStatus::Writing),
            'L' => Ok(ChunkStatus::LocallyEncoded),
            'T' => Ok(ChunkStatus::Temporary),
            'E' => Ok(ChunkStatus::GloballyEncoding),
            'G' => Ok(ChunkStatus::GloballyEncoded),
            'R' => Ok(ChunkStatus::Recovering),
            'F' => Ok(ChunkStatus::Faulty),
            other => Err(BadStatusLetter(other)),
        }
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// An unrecognized chunk-status letter on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown chunk status letter: {0:?}")]
pub struct BadStatusLetter(pub char);

/// Terminal (and in-flight) outcome of a global-encoding job as reported to
/// the metadata service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// The job is in progress.
    Running,
    /// The job completed and the global parity is registered.
    Done,
    /// The job failed and was rolled back.
    Fail,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Erasure parameters for the global-encoding pipeline.
///
/// `local_shards` is the shard count of one encoding group; a job consumes
/// `3 × local_shards` input fragments and produces `local_shards` parity
/// shards before XOR-compressing them into one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeConfig {
    /// Shards per encoding group.
    pub local_shards: usize,
    /// Size of every chunk fragment in bytes.
    pub chunk_size: u64,
}

impl EncodeConfig {
    /// Number of data streams fed to the global Reed-Solomon encoder.
    pub fn data_streams(&self) -> usize {
        self.local_shards * 3
    }

    /// Number of parity streams produced by the global encoder.
    pub fn parity_streams(&self) -> usize {
        self.local_shards
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            local_shards: 2,
            chunk_size: 67_108_864, // 64 MB
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

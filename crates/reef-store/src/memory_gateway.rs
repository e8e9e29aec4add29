//! In-memory storage gateway backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use reef_types::{GroupId, VolumeId};
use tracing::debug;

use crate::error::StoreError;
use crate::gateway::{StoreGateway, StoreTicket};
use crate::request::{StoreOp, StoreRequest};
use crate::STREAM_BLOCK_SIZE;

type ChunkMap = HashMap<(VolumeId, GroupId), BTreeMap<String, Vec<u8>>>;

/// In-memory gateway backed by a `RwLock<HashMap>`.
///
/// Useful for tests and memory-only nodes. Chunk names are kept sorted per
/// volume so candidate scans are deterministic.
#[derive(Default, Clone)]
pub struct MemoryGateway {
    chunks: Arc<RwLock<ChunkMap>>,
}

impl MemoryGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a chunk directly, bypassing the request path.
    pub fn insert_chunk(
        &self,
        volume: VolumeId,
        encoding_group: GroupId,
        chunk: impl Into<String>,
        data: Vec<u8>,
    ) {
        let mut map = self.chunks.write().expect("lock poisoned");
        map.entry((volume, encoding_group))
            .or_default()
            .insert(chunk.into(), data);
    }

    /// Read a chunk's bytes directly, bypassing the request path.
    pub fn chunk_data(
        &self,
        volume: VolumeId,
        encoding_group: GroupId,
        chunk: &str,
    ) -> Option<Vec<u8>> {
        let map = self.chunks.read().expect("lock poisoned");
        map.get(&(volume, encoding_group))
            .and_then(|chunks| chunks.get(chunk).cloned())
    }

    /// All chunk names on a volume, in sorted order.
    pub fn chunk_names(&self, volume: VolumeId, encoding_group: GroupId) -> Vec<String> {
        let map = self.chunks.read().expect("lock poisoned");
        map.get(&(volume, encoding_group))
            .map(|chunks| chunks.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn serve(chunks: Arc<RwLock<ChunkMap>>, req: StoreRequest) -> Result<(), StoreError> {
        let key = (req.volume, req.encoding_group);
        match req.op {
            StoreOp::WriteAll => {
                let input = req.input.ok_or(StoreError::MissingStream(req.op))?;
                let data = input.read_to_end().await?;
                debug!(chunk = %req.chunk, size = data.len(), "stored chunk in memory");
                let mut map = chunks.write().expect("lock poisoned");
                map.entry(key).or_default().insert(req.chunk, data);
                Ok(())
            }
            StoreOp::ReadAll => {
                let mut output = req.output.ok_or(StoreError::MissingStream(req.op))?;
                let data = {
                    let map = chunks.read().expect("lock poisoned");
                    map.get(&key).and_then(|c| c.get(&req.chunk).cloned())
                };
                let Some(data) = data else {
                    let err = StoreError::NotFound(req.chunk);
                    output.fail(crate::PipeError::upstream(&err)).await;
                    return Err(err);
                };
                for block in data.chunks(STREAM_BLOCK_SIZE) {
                    output.write(Bytes::copy_from_slice(block)).await?;
                }
                Ok(())
            }
            StoreOp::DeleteReal => {
                let mut map = chunks.write().expect("lock poisoned");
                if let Some(c) = map.get_mut(&key) {
                    c.remove(&req.chunk);
                }
                debug!(chunk = %req.chunk, "deleted chunk from memory");
                Ok(())
            }
            StoreOp::Read | StoreOp::Write | StoreOp::Delete => {
                Err(StoreError::Unsupported(req.op))
            }
        }
    }
}

#[async_trait::async_trait]
impl StoreGateway for MemoryGateway {
    async fn push(&self, req: StoreRequest) -> Result<StoreTicket, StoreError> {
        let (done, ticket) = StoreTicket::channel();
        let chunks = self.chunks.clone();
        tokio::spawn(async move {
            done.complete(Self::serve(chunks, req).await);
        });
        Ok(ticket)
    }

    async fn rename_chunk(
        &self,
        src: &str,
        dest: &str,
        volume: VolumeId,
        encoding_group: GroupId,
    ) -> Result<(), StoreError> {
        let mut map = self.chunks.write().expect("lock poisoned");
        let chunks = map
            .get_mut(&(volume, encoding_group))
            .ok_or_else(|| StoreError::NotFound(src.to_string()))?;
        let data = chunks
            .remove(src)
            .ok_or_else(|| StoreError::NotFound(src.to_string()))?;
        chunks.insert(dest.to_string(), data);
        debug!(src, dest, %volume, "renamed chunk");
        Ok(())
    }

    async fn get_non_coded_chunk(
        &self,
        volume: VolumeId,
        encoding_group: GroupId,
    ) -> Result<Option<String>, StoreError> {
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.get(&(volume, encoding_group)).and_then(|chunks| {
            chunks
                .keys()
                .find(|name| name.starts_with("L_"))
                .cloned()
        }))
    }
}

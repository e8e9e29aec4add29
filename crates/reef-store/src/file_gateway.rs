//! File-based storage gateway backend.
//!
//! Stores one file per chunk under `{base}/vol-<v>/eg-<g>/<chunk_name>`.
//! Writes are atomic: data lands in a `.part` file first, then is renamed
//! into place, so a failed `WriteAll` never leaves a half-written chunk
//! under its final name.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use reef_types::{GroupId, VolumeId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::StoreError;
use crate::gateway::{StoreGateway, StoreTicket};
use crate::pipe::PipeError;
use crate::request::{StoreOp, StoreRequest};
use crate::STREAM_BLOCK_SIZE;

/// File-per-chunk gateway.
pub struct FileGateway {
    base_dir: Arc<PathBuf>,
}

impl FileGateway {
    /// Create a file gateway rooted at `base_dir`, creating it if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir: Arc::new(base_dir),
        })
    }

    fn volume_dir(base: &Path, volume: VolumeId, group: GroupId) -> PathBuf {
        base.join(volume.to_string()).join(group.to_string())
    }

    fn chunk_path(base: &Path, volume: VolumeId, group: GroupId, chunk: &str) -> PathBuf {
        Self::volume_dir(base, volume, group).join(chunk)
    }

    async fn serve(base: Arc<PathBuf>, req: StoreRequest) -> Result<(), StoreError> {
        let path = Self::chunk_path(&base, req.volume, req.encoding_group, &req.chunk);
        match req.op {
            StoreOp::WriteAll => {
                let mut input = req.input.ok_or(StoreError::MissingStream(req.op))?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let part_path = path.with_extension("part");
                let mut file = tokio::fs::File::create(&part_path).await?;
                loop {
                    match input.read().await {
                        Ok(Some(block)) => file.write_all(&block).await?,
                        Ok(None) => break,
                        Err(e) => {
                            drop(file);
                            let _ = tokio::fs::remove_file(&part_path).await;
                            return Err(e.into());
                        }
                    }
                }
                file.flush().await?;
                drop(file);
                tokio::fs::rename(&part_path, &path).await?;
                debug!(chunk = %req.chunk, path = %path.display(), "stored chunk file");
                Ok(())
            }
            StoreOp::ReadAll => {
                let mut output = req.output.ok_or(StoreError::MissingStream(req.op))?;
                let mut file = match tokio::fs::File::open(&path).await {
                    Ok(f) => f,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        let err = StoreError::NotFound(req.chunk);
                        output.fail(PipeError::upstream(&err)).await;
                        return Err(err);
                    }
                    Err(e) => {
                        output.fail(PipeError::upstream(&e)).await;
                        return Err(e.into());
                    }
                };
                let mut buf = BytesMut::with_capacity(STREAM_BLOCK_SIZE);
                loop {
                    buf.resize(STREAM_BLOCK_SIZE, 0);
                    let n = match file.read(&mut buf).await {
                        Ok(n) => n,
                        Err(e) => {
                            output.fail(PipeError::upstream(&e)).await;
                            return Err(e.into());
                        }
                    };
                    if n == 0 {
                        break;
                    }
                    buf.truncate(n);
                    output.write(buf.split().freeze()).await?;
                }
                Ok(())
            }
            StoreOp::DeleteReal => match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(chunk = %req.chunk, "deleted chunk file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
            StoreOp::Read | StoreOp::Write | StoreOp::Delete => {
                Err(StoreError::Unsupported(req.op))
            }
        }
    }
}

#[async_trait::async_trait]
impl StoreGateway for FileGateway {
    async fn push(&self, req: StoreRequest) -> Result<StoreTicket, StoreError> {
        let (done, ticket) = StoreTicket::channel();
        let base = self.base_dir.clone();
        tokio::spawn(async move {
            done.complete(Self::serve(base, req).await);
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
        let src_path = Self::chunk_path(&self.base_dir, volume, encoding_group, src);
        let dest_path = Self::chunk_path(&self.base_dir, volume, encoding_group, dest);
        match tokio::fs::rename(&src_path, &dest_path).await {
            Ok(()) => {
                debug!(src, dest, %volume, "renamed chunk file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(src.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_non_coded_chunk(
        &self,
        volume: VolumeId,
        encoding_group: GroupId,
    ) -> Result<Option<String>, StoreError> {
        let dir = Self::volume_dir(&self.base_dir, volume, encoding_group);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // Sort for a deterministic scan order; read_dir order is arbitrary.
        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Staging files keep the chunk's prefix until renamed into
            // place; an in-flight write is not a candidate.
            if name.starts_with("L_") && !name.ends_with(".part") {
                candidates.push(name);
            }
        }
        candidates.sort();
        Ok(candidates.into_iter().next())
    }
}

//! Peer-region chunk transfer and status RPC client.

use std::time::Duration;

use futures::StreamExt;
use reef_store::{PipeError, PipeReader, PipeWriter};
use reef_types::{ChunkStatus, GroupId, Region, VolumeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NetError;
use crate::{HDR_CHUNK_NAME, HDR_ENCODING_GROUP, HDR_SHARD_NUMBER, HDR_VOLUME};

/// Body of a `POST /chunk/status` request.
///
/// `job` identifies the claiming job when `status` is `E`; re-marking with
/// the same job id is a no-op while a different job id is rejected with
/// HTTP 409.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Encoding group the chunk belongs to.
    pub encoding_group: GroupId,
    /// Bare chunk identifier.
    pub chunk_id: String,
    /// Requested status, single-letter wire form.
    pub status: char,
    /// Claiming job id, for `GloballyEncoding` marks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<u64>,
}

/// Client side of the peer-node chunk transfer and status interface.
///
/// Abstracted as a trait so orchestrator tests can substitute an in-memory
/// fabric for real HTTP.
#[async_trait::async_trait]
pub trait PeerClient: Send + Sync {
    /// `GET /chunk`: stream fragment `shard_number` of `chunk_name` from
    /// `region` into `sink`.
    ///
    /// On any failure the sink is closed with the error so a downstream
    /// consumer blocked on the pipe is released.
    async fn fetch_shard(
        &self,
        region: &Region,
        encoding_group: GroupId,
        chunk_name: &str,
        shard_number: u32,
        sink: PipeWriter,
    ) -> Result<(), NetError>;

    /// `PUT /chunk`: push `content_length` bytes from `source` to the node
    /// at `endpoint`, addressed to the given volume and group. The response
    /// body is drained and discarded.
    async fn put_chunk(
        &self,
        endpoint: &str,
        volume: VolumeId,
        encoding_group: GroupId,
        chunk_name: &str,
        content_length: u64,
        source: PipeReader,
    ) -> Result<(), NetError>;

    /// `POST /chunk/status`: request a status transition at the chunk's
    /// owning region.
    async fn set_chunk_status(
        &self,
        region: &Region,
        encoding_group: GroupId,
        chunk_id: &str,
        status: ChunkStatus,
        job: Option<u64>,
    ) -> Result<(), NetError>;
}

/// Reqwest-backed [`PeerClient`] with streaming bodies.
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    /// Create a client with the given connect/read timeout.
    ///
    /// The timeout bounds connection establishment and idle reads, not the
    /// total transfer time — chunk bodies are large.
    pub fn new(timeout: Duration) -> Result<Self, NetError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_shard(
        &self,
        region: &Region,
        encoding_group: GroupId,
        chunk_name: &str,
        shard_number: u32,
        sink: PipeWriter,
    ) -> Result<(), NetError> {
        let url = format!("{}/chunk", region.endpoint);
        let sent = self
            .client
            .get(&url)
            .header(HDR_ENCODING_GROUP, encoding_group.0)
            .header(HDR_CHUNK_NAME, chunk_name)
            .header(HDR_SHARD_NUMBER, shard_number)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                sink.fail(PipeError::upstream(&e)).await;
                return Err(e.into());
            }
        };
        if !response.status().is_success() {
            let err = NetError::Rejected {
                operation: "fetch shard",
                url,
                status: response.status().as_u16(),
            };
            sink.fail(PipeError::upstream(&err)).await;
            return Err(err);
        }

        let mut sink = sink;
        let mut body = response.bytes_stream();
        while let Some(block) = body.next().await {
            match block {
                Ok(block) => sink.write(block).await?,
                Err(e) => {
                    sink.fail(PipeError::upstream(&e)).await;
                    return Err(e.into());
                }
            }
        }
        debug!(region = %region.name, chunk_name, shard_number, "fetched shard fragment");
        Ok(())
    }

    async fn put_chunk(
        &self,
        endpoint: &str,
        volume: VolumeId,
        encoding_group: GroupId,
        chunk_name: &str,
        content_length: u64,
        source: PipeReader,
    ) -> Result<(), NetError> {
        let url = format!("{endpoint}/chunk");
        let response = self
            .client
            .put(&url)
            .header(HDR_VOLUME, volume.0)
            .header(HDR_ENCODING_GROUP, encoding_group.0)
            .header(HDR_CHUNK_NAME, chunk_name)
            .header(reqwest::header::CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(source.into_stream()))
            .send()
            .await?;
        let status = response.status();
        // Drain before judging, so the connection can be reused.
        let _ = response.bytes().await;
        if !status.is_success() {
            return Err(NetError::Rejected {
                operation: "put chunk",
                url,
                status: status.as_u16(),
            });
        }
        debug!(endpoint, chunk_name, %volume, "distributed parity chunk");
        Ok(())
    }

    async fn set_chunk_status(
        &self,
        region: &Region,
        encoding_group: GroupId,
        chunk_id: &str,
        status: ChunkStatus,
        job: Option<u64>,
    ) -> Result<(), NetError> {
        let url = format!("{}/chunk/status", region.endpoint);
        let change = StatusChange {
            encoding_group,
            chunk_id: chunk_id.to_string(),
            status: status.letter(),
            job,
        };
        let response = self.client.post(&url).json(&change).send().await?;
        match response.status().as_u16() {
            200..=299 => Ok(()),
            409 => Err(NetError::AlreadyClaimed {
                chunk_id: chunk_id.to_string(),
            }),
            code => Err(NetError::Rejected {
                operation: "set chunk status",
                url,
                status: code,
            }),
        }
    }
}

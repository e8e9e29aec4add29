//! Chunk-transfer and RPC endpoints.
//!
//! The daemon exposes the inter-region wire contract:
//!
//! - `GET /chunk` — stream one fragment of a chunk (headers:
//!   `Encoding-Group`, `Chunk-Name`, `Shard-Number`)
//! - `PUT /chunk` — store a chunk streamed in the request body (headers:
//!   `Volume`, `Encoding-Group`, `Chunk-Name`, `Content-Length`)
//! - `POST /chunk/status` — request a chunk status transition; a contested
//!   claim answers 409
//! - `POST /encode` — accept an encoding job and run it detached (202)
//! - `GET /candidate?volume=&encoding-group=` — next un-encoded chunk

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use reef_encode::{next_candidate, GlobalEncoder, GroupView, StatusBoard, StatusError};
use reef_net::{StatusChange, HDR_CHUNK_NAME, HDR_ENCODING_GROUP, HDR_SHARD_NUMBER, HDR_VOLUME};
use reef_store::{pipe, PipeError, PipeWriter, StoreError, StoreGateway, StoreRequest};
use reef_types::{ChunkStatus, EncodingToken, GroupId, VolumeId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Local chunk storage.
    pub gateway: Arc<dyn StoreGateway>,
    /// The job orchestrator.
    pub encoder: Arc<GlobalEncoder>,
    /// Authoritative chunk statuses for this region.
    pub board: Arc<StatusBoard>,
    /// Encoding-group layout.
    pub groups: Arc<dyn GroupView>,
}

/// Build the daemon's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chunk", get(get_chunk).put(put_chunk))
        .route("/chunk/status", post(set_chunk_status))
        .route("/encode", post(start_encode))
        .route("/candidate", get(candidate))
        .with_state(state)
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid header {0}")]
    BadHeader(&'static str),

    #[error("chunk not found")]
    NotFound,

    #[error("unknown encoding group {0}")]
    UnknownGroup(GroupId),

    #[error("shard number {0} out of range")]
    BadShard(u32),

    #[error("unknown status letter {0:?}")]
    BadStatus(char),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("store error: {0}")]
    Store(#[from] reef_store::StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match &self {
            ApiError::BadHeader(_) | ApiError::BadStatus(_) | ApiError::BadShard(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound | ApiError::UnknownGroup(_) => StatusCode::NOT_FOUND,
            ApiError::Status(_) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (code, self.to_string()).into_response()
    }
}

fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &'static str) -> Result<T, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .ok_or(ApiError::BadHeader(name))
}

/// `GET /chunk` — stream fragment `Shard-Number` of a chunk.
///
/// Fragment `i` of a chunk lives on member volume `i` of its encoding
/// group, stored under the chunk's own name.
async fn get_chunk(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let group = GroupId(header::<u32>(&headers, HDR_ENCODING_GROUP)?);
    let chunk: String = header(&headers, HDR_CHUNK_NAME)?;
    let shard: u32 = header(&headers, HDR_SHARD_NUMBER)?;

    let members = state
        .groups
        .members(group)
        .ok_or(ApiError::UnknownGroup(group))?;
    let member = members
        .get(shard as usize)
        .ok_or(ApiError::BadShard(shard))?;

    let (writer, mut reader) = pipe();
    let ticket = state
        .gateway
        .push(StoreRequest::read_all(member.volume, group, &chunk, writer))
        .await?;

    // Pull the first block before committing to a streamed response; the
    // ticket then carries the cause, so a missing chunk gets a clean 404
    // and a failed read a 500.
    let first = match reader.read().await {
        Ok(block) => block,
        Err(e) => {
            return Err(match ticket.wait().await {
                Err(StoreError::NotFound(_)) => ApiError::NotFound,
                Err(err) => ApiError::Store(err),
                Ok(()) => ApiError::Store(StoreError::Pipe(e)),
            })
        }
    };
    tokio::spawn(async move {
        if let Err(e) = ticket.wait().await {
            warn!(error = %e, "chunk read did not complete");
        }
    });
    let body = match first {
        None => Body::empty(),
        Some(block) => Body::from_stream(
            futures::stream::once(async move { Ok::<_, PipeError>(block) })
                .chain(reader.into_stream()),
        ),
    };
    Ok(body.into_response())
}

/// `PUT /chunk` — store the request body as a chunk.
async fn put_chunk(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let volume = VolumeId(header::<u32>(&headers, HDR_VOLUME)?);
    let group = GroupId(header::<u32>(&headers, HDR_ENCODING_GROUP)?);
    let chunk: String = header(&headers, HDR_CHUNK_NAME)?;

    let (writer, reader) = pipe();
    let ticket = state
        .gateway
        .push(StoreRequest::write_all(volume, group, &chunk, reader))
        .await?;
    feed_store(writer, body).await;
    ticket.wait().await?;
    Ok(StatusCode::CREATED)
}

/// Forward the request body into the store pipe. A body error fails the
/// pipe, so the write is aborted and its ticket carries the cause.
async fn feed_store(mut writer: PipeWriter, body: Body) {
    let mut stream = body.into_data_stream();
    while let Some(block) = stream.next().await {
        match block {
            Ok(block) => {
                if writer.write(block).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                writer.fail(PipeError::upstream(&e)).await;
                return;
            }
        }
    }
}

/// `POST /chunk/status` — apply a status transition on this region's board.
async fn set_chunk_status(
    State(state): State<AppState>,
    Json(change): Json<StatusChange>,
) -> Result<StatusCode, ApiError> {
    let status =
        ChunkStatus::from_letter(change.status).map_err(|e| ApiError::BadStatus(e.0))?;
    state
        .board
        .set(change.encoding_group, &change.chunk_id, status, change.job)?;
    Ok(StatusCode::OK)
}

/// `POST /encode` — accept a job and run it detached.
///
/// Fire-and-forget: the outcome is reported to the metadata service, not
/// to the caller.
async fn start_encode(
    State(state): State<AppState>,
    Json(token): Json<EncodingToken>,
) -> StatusCode {
    info!(job = token.job_id, primary = %token.primary.chunk_id, "accepted encoding job");
    let encoder = state.encoder.clone();
    tokio::spawn(async move {
        let _ = encoder.run(token).await;
    });
    StatusCode::ACCEPTED
}

#[derive(Deserialize)]
struct CandidateQuery {
    volume: u32,
    #[serde(rename = "encoding-group")]
    encoding_group: u32,
}

#[derive(Serialize)]
struct CandidateResponse {
    chunk_id: Option<String>,
}

/// `GET /candidate` — the next chunk eligible for global encoding.
async fn candidate(
    State(state): State<AppState>,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<CandidateResponse>, ApiError> {
    let chunk_id = next_candidate(
        state.gateway.as_ref(),
        VolumeId(query.volume),
        GroupId(query.encoding_group),
    )
    .await?;
    Ok(Json(CandidateResponse { chunk_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use reef_encode::{GroupMember, StaticGroupView};
    use reef_net::{HttpMetaClient, HttpPeerClient};
    use reef_store::{FileGateway, MemoryGateway};
    use reef_types::EncodeConfig;

    fn test_state(gateway: Arc<dyn StoreGateway>) -> AppState {
        let mut view = StaticGroupView::new();
        view.insert(
            GroupId(1),
            vec![
                GroupMember {
                    volume: VolumeId(0),
                    endpoint: "http://unused".to_string(),
                },
                GroupMember {
                    volume: VolumeId(1),
                    endpoint: "http://unused".to_string(),
                },
            ],
        );
        let groups: Arc<dyn GroupView> = Arc::new(view);
        let timeout = Duration::from_secs(1);
        let encoder = GlobalEncoder::new(
            gateway.clone(),
            Arc::new(HttpPeerClient::new(timeout).unwrap()),
            Arc::new(HttpMetaClient::new("http://127.0.0.1:9", timeout).unwrap()),
            groups.clone(),
            EncodeConfig::default(),
        );
        AppState {
            gateway,
            encoder: Arc::new(encoder),
            board: Arc::new(StatusBoard::new()),
            groups,
        }
    }

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.ok();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_chunk_roundtrip_over_http() {
        let gateway = MemoryGateway::new();
        let base = serve(test_state(Arc::new(gateway.clone()))).await;
        let client = reqwest::Client::new();

        let put = client
            .put(format!("{base}/chunk"))
            .header(HDR_VOLUME, 0u32)
            .header(HDR_ENCODING_GROUP, 1u32)
            .header(HDR_CHUNK_NAME, "L_42")
            .body(vec![7u8; 300])
            .send()
            .await
            .unwrap();
        assert_eq!(put.status(), 201);
        assert_eq!(
            gateway.chunk_data(VolumeId(0), GroupId(1), "L_42"),
            Some(vec![7u8; 300])
        );

        let got = client
            .get(format!("{base}/chunk"))
            .header(HDR_ENCODING_GROUP, 1u32)
            .header(HDR_CHUNK_NAME, "L_42")
            .header(HDR_SHARD_NUMBER, 0u32)
            .send()
            .await
            .unwrap();
        assert_eq!(got.status(), 200);
        assert_eq!(got.bytes().await.unwrap().to_vec(), vec![7u8; 300]);
    }

    #[tokio::test]
    async fn test_get_missing_chunk_is_404() {
        let base = serve(test_state(Arc::new(MemoryGateway::new()))).await;
        let got = reqwest::Client::new()
            .get(format!("{base}/chunk"))
            .header(HDR_ENCODING_GROUP, 1u32)
            .header(HDR_CHUNK_NAME, "L_gone")
            .header(HDR_SHARD_NUMBER, 1u32)
            .send()
            .await
            .unwrap();
        assert_eq!(got.status(), 404);
    }

    #[tokio::test]
    async fn test_get_unreadable_chunk_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let gw = FileGateway::new(dir.path()).unwrap();
        // A directory under the chunk name opens fine but fails the read,
        // which must not masquerade as a missing chunk.
        std::fs::create_dir_all(dir.path().join("vol-0").join("eg-1").join("L_dir")).unwrap();
        let base = serve(test_state(Arc::new(gw))).await;
        let got = reqwest::Client::new()
            .get(format!("{base}/chunk"))
            .header(HDR_ENCODING_GROUP, 1u32)
            .header(HDR_CHUNK_NAME, "L_dir")
            .header(HDR_SHARD_NUMBER, 0u32)
            .send()
            .await
            .unwrap();
        assert_eq!(got.status(), 500);
    }

    #[tokio::test]
    async fn test_status_endpoint_guards_claims() {
        let base = serve(test_state(Arc::new(MemoryGateway::new()))).await;
        let client = reqwest::Client::new();
        let url = format!("{base}/chunk/status");

        let set = |status: char, job: Option<u64>| {
            let client = client.clone();
            let url = url.clone();
            async move {
                client
                    .post(&url)
                    .json(&StatusChange {
                        encoding_group: GroupId(1),
                        chunk_id: "42".to_string(),
                        status,
                        job,
                    })
                    .send()
                    .await
                    .unwrap()
                    .status()
                    .as_u16()
            }
        };

        assert_eq!(set('L', None).await, 200);
        assert_eq!(set('E', Some(5)).await, 200);
        assert_eq!(set('E', Some(5)).await, 200);
        assert_eq!(set('E', Some(6)).await, 409);
        assert_eq!(set('?', None).await, 400);
    }

    #[tokio::test]
    async fn test_candidate_endpoint() {
        let gateway = MemoryGateway::new();
        gateway.insert_chunk(VolumeId(0), GroupId(1), "G_1", vec![]);
        gateway.insert_chunk(VolumeId(0), GroupId(1), "L_123", vec![]);
        let base = serve(test_state(Arc::new(gateway))).await;

        let got: serde_json::Value = reqwest::Client::new()
            .get(format!("{base}/candidate?volume=0&encoding-group=1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(got["chunk_id"], "123");
    }

    #[tokio::test]
    async fn test_encode_is_fire_and_forget() {
        let base = serve(test_state(Arc::new(MemoryGateway::new()))).await;
        let token = serde_json::json!({
            "job_id": 1,
            "first": {
                "region": { "name": "r1", "endpoint": "http://127.0.0.1:9" },
                "encoding_group": 7, "chunk_id": "a", "volume": 0
            },
            "second": {
                "region": { "name": "r2", "endpoint": "http://127.0.0.1:9" },
                "encoding_group": 7, "chunk_id": "b", "volume": 0
            },
            "third": {
                "region": { "name": "r3", "endpoint": "http://127.0.0.1:9" },
                "encoding_group": 7, "chunk_id": "c", "volume": 0
            },
            "primary": {
                "region": { "name": "home", "endpoint": "http://127.0.0.1:9" },
                "encoding_group": 7, "chunk_id": "p", "volume": 0
            }
        });
        let resp = reqwest::Client::new()
            .post(format!("{base}/encode"))
            .json(&token)
            .send()
            .await
            .unwrap();
        // Accepted even though the job itself will fail later (unknown
        // group, unreachable peers) — the outcome goes to the metadata
        // service, not the caller.
        assert_eq!(resp.status(), 202);
    }
}

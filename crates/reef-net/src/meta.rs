//! Metadata service client.

use std::time::Duration;

use reef_types::{EncodingToken, JobStatus};
use serde::Serialize;
use tracing::debug;

use crate::error::NetError;

#[derive(Serialize)]
struct JobStatusBody {
    status: JobStatus,
}

/// Client side of the metadata service interface.
#[async_trait::async_trait]
pub trait MetaClient: Send + Sync {
    /// Record the outcome of an encoding job.
    async fn set_job_status(&self, job_id: u64, status: JobStatus) -> Result<(), NetError>;

    /// Register the finished group layout so readers can locate global
    /// parity for the encoded shards.
    async fn job_finished(&self, token: &EncodingToken) -> Result<(), NetError>;
}

/// Reqwest-backed [`MetaClient`] speaking HTTP+JSON to a single base URL.
pub struct HttpMetaClient {
    client: reqwest::Client,
    base: String,
}

impl HttpMetaClient {
    /// Create a client for the metadata service at `base`, with `timeout`
    /// applied to every request.
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, NetError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.into(),
        })
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<(), NetError> {
        let url = format!("{}{path}", self.base);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetError::Rejected {
                operation: "metadata update",
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetaClient for HttpMetaClient {
    async fn set_job_status(&self, job_id: u64, status: JobStatus) -> Result<(), NetError> {
        self.post(
            &format!("/v1/jobs/{job_id}/status"),
            &JobStatusBody { status },
        )
        .await?;
        debug!(job_id, ?status, "reported job status");
        Ok(())
    }

    async fn job_finished(&self, token: &EncodingToken) -> Result<(), NetError> {
        self.post("/v1/jobs/finished", token).await?;
        debug!(job_id = token.job_id, "registered finished job");
        Ok(())
    }
}

//! The storage gateway trait and request completion plumbing.

use reef_types::{GroupId, VolumeId};
use tokio::sync::oneshot;

use crate::error::StoreError;
use crate::request::StoreRequest;

/// Trait for the local storage gateway consumed by the encoding pipeline.
///
/// `push` is asynchronous in two senses: the call itself only enqueues the
/// request, and the returned [`StoreTicket`] resolves once the gateway has
/// fully processed it. The ticket wait carries no deadline — a hang in the
/// gateway hangs the job.
#[async_trait::async_trait]
pub trait StoreGateway: Send + Sync {
    /// Enqueue a store request. Streaming requests begin transferring
    /// immediately through their pipe.
    async fn push(&self, req: StoreRequest) -> Result<StoreTicket, StoreError>;

    /// Atomically rename a chunk within a volume.
    async fn rename_chunk(
        &self,
        src: &str,
        dest: &str,
        volume: VolumeId,
        encoding_group: GroupId,
    ) -> Result<(), StoreError>;

    /// Return the name of the first chunk still in locally-encoded state
    /// (`L_` prefix), or `None` when no candidate exists.
    async fn get_non_coded_chunk(
        &self,
        volume: VolumeId,
        encoding_group: GroupId,
    ) -> Result<Option<String>, StoreError>;
}

/// Completion signal for one pushed store request.
#[derive(Debug)]
pub struct StoreTicket {
    done: oneshot::Receiver<Result<(), StoreError>>,
}

impl StoreTicket {
    /// Create a connected completion handle / ticket pair.
    ///
    /// Gateway implementations hold the [`Completion`] and resolve it once
    /// the operation finishes.
    pub fn channel() -> (Completion, StoreTicket) {
        let (tx, rx) = oneshot::channel();
        (Completion { tx }, StoreTicket { done: rx })
    }

    /// Block until the gateway has processed the request.
    pub async fn wait(self) -> Result<(), StoreError> {
        self.done.await.unwrap_or(Err(StoreError::GatewayClosed))
    }
}

/// The gateway-side end of a [`StoreTicket`].
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Result<(), StoreError>>,
}

impl Completion {
    /// Resolve the paired ticket.
    pub fn complete(self, result: Result<(), StoreError>) {
        // The caller may have dropped the ticket; that's fine.
        let _ = self.tx.send(result);
    }
}

//! The global-encoding orchestrator.
//!
//! [`GlobalEncoder::run`] drives one job end to end: claim the four
//! participating shards, pull the source fragments from their regions,
//! Reed-Solomon-encode them into per-shard global parities, compress those
//! into one object by byte-wise XOR, distribute parity shards to the other
//! group members, promote every chunk and report the outcome. Any failure
//! before the metadata notification jumps to a compensating rollback that
//! deletes every temporary chunk and restores shard statuses.

use std::sync::Arc;

use reef_erasure::{stream_encode, stream_xor};
use reef_net::{MetaClient, PeerClient};
use reef_store::{pipe, StoreGateway, StoreRequest, StoreTicket};
use reef_types::{name, ChunkStatus, EncodeConfig, EncodingToken, GroupId, JobStatus, VolumeId};
use tracing::{debug, error, info, warn};

use crate::error::EncodeError;
use crate::group::{GroupMember, GroupView};
use crate::undo::UndoLog;

/// Orchestrates global-encoding jobs on one node.
///
/// Stateless across jobs; all per-job state lives on the stack of `run`,
/// so one encoder instance serves any number of concurrent jobs.
pub struct GlobalEncoder {
    gateway: Arc<dyn StoreGateway>,
    peers: Arc<dyn PeerClient>,
    meta: Arc<dyn MetaClient>,
    groups: Arc<dyn GroupView>,
    config: EncodeConfig,
}

impl GlobalEncoder {
    /// Create an encoder over the node's gateway, clients, and cluster view.
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        peers: Arc<dyn PeerClient>,
        meta: Arc<dyn MetaClient>,
        groups: Arc<dyn GroupView>,
        config: EncodeConfig,
    ) -> Self {
        Self {
            gateway,
            peers,
            meta,
            groups,
            config,
        }
    }

    /// Run one encoding job to completion.
    ///
    /// On failure the recorded compensations are executed before the error
    /// is returned; the token can then be re-submitted safely.
    pub async fn run(&self, token: EncodingToken) -> Result<(), EncodeError> {
        info!(job = token.job_id, primary = %token.primary.chunk_id, "starting global-encoding job");
        if let Err(e) = self.meta.set_job_status(token.job_id, JobStatus::Running).await {
            warn!(job = token.job_id, error = %e, "could not report job as running");
        }

        let mut undo = UndoLog::default();
        match self.execute(&token, &mut undo).await {
            Ok(()) => {
                info!(job = token.job_id, "global-encoding job done");
                Ok(())
            }
            Err(e) => {
                error!(job = token.job_id, error = %e, "global-encoding job failed, rolling back");
                self.rollback(&token, undo).await;
                Err(e)
            }
        }
    }

    /// Resolve and validate the primary's group layout.
    fn group_members(&self, token: &EncodingToken) -> Result<Vec<GroupMember>, EncodeError> {
        let group = token.primary.encoding_group;
        let members = self
            .groups
            .members(group)
            .ok_or(EncodeError::UnknownGroup(group))?;
        let expected = self.config.local_shards + 1;
        if members.len() != expected {
            return Err(EncodeError::BadGroupShape {
                group,
                volumes: members.len(),
                expected,
                local_shards: self.config.local_shards,
            });
        }
        if members[0].volume != token.primary.volume {
            return Err(EncodeError::LeaderMismatch {
                group,
                expected: token.primary.volume,
                found: members[0].volume,
            });
        }
        Ok(members)
    }

    async fn execute(
        &self,
        token: &EncodingToken,
        undo: &mut UndoLog,
    ) -> Result<(), EncodeError> {
        let members = self.group_members(token)?;
        let primary = &token.primary;
        let volume = primary.volume;
        let group = primary.encoding_group;
        let pid = primary.chunk_id.as_str();
        let k = self.config.data_streams();
        let m = self.config.parity_streams();

        // Claim all four shards before touching any data.
        for shard in token.participants() {
            self.peers
                .set_chunk_status(
                    &shard.region,
                    shard.encoding_group,
                    &shard.chunk_id,
                    ChunkStatus::GloballyEncoding,
                    Some(token.job_id),
                )
                .await?;
        }

        // Download every source fragment into a temporary chunk, one
        // transfer at a time. Each chunk is recorded before the fetch, so
        // a torn download still gets swept.
        let mut downloads: Vec<String> = Vec::with_capacity(k);
        for source in token.sources() {
            let source_chunk = name::locally_encoded(&source.chunk_id);
            for fragment in 0..self.config.local_shards {
                let download = name::temp_download(&source.region.name, &source.chunk_id, fragment);
                undo.record(volume, group, &download);
                let (sink, stored) = pipe();
                let ticket = self
                    .gateway
                    .push(StoreRequest::write_all(volume, group, &download, stored))
                    .await?;
                let (fetched, written) = tokio::join!(
                    self.peers.fetch_shard(
                        &source.region,
                        source.encoding_group,
                        &source_chunk,
                        fragment as u32,
                        sink,
                    ),
                    ticket.wait()
                );
                fetched?;
                written?;
                downloads.push(download);
            }
        }
        debug!(job = token.job_id, fragments = downloads.len(), "source fragments downloaded");

        // Stream all fragments through the Reed-Solomon encoder into
        // temporary per-shard parity chunks.
        let mut data_readers = Vec::with_capacity(k);
        let mut read_tickets = Vec::with_capacity(k);
        for download in &downloads {
            let (writer, reader) = pipe();
            let ticket = self
                .gateway
                .push(StoreRequest::read_all(volume, group, download, writer))
                .await?;
            data_readers.push(reader);
            read_tickets.push(ticket);
        }
        let mut parity_names = Vec::with_capacity(m);
        let mut parity_writers = Vec::with_capacity(m);
        let mut write_tickets = Vec::with_capacity(m);
        for shard in 0..m {
            let parity = name::temp_shard_parity(pid, shard);
            undo.record(volume, group, &parity);
            let (writer, reader) = pipe();
            let ticket = self
                .gateway
                .push(StoreRequest::write_all(volume, group, &parity, reader))
                .await?;
            parity_names.push(parity);
            parity_writers.push(writer);
            write_tickets.push(ticket);
        }
        let encoded = tokio::spawn(stream_encode(k, m, data_readers, parity_writers));
        let parity_len = encoded.await??;
        self.wait_all(read_tickets).await?;
        self.wait_all(write_tickets).await?;
        debug!(job = token.job_id, parity_len, "global parity encoded");

        // The downloads are dead weight now; purge before the memory- and
        // network-heavy tail of the job.
        for download in &downloads {
            self.delete_chunk(volume, group, download).await?;
            undo.forget(volume, download);
        }

        // Compress the per-shard parities into one object by byte-wise XOR.
        let temp_parity = name::temp_parity(pid);
        undo.record(volume, group, &temp_parity);
        let mut parity_readers = Vec::with_capacity(m);
        let mut fold_tickets = Vec::with_capacity(m);
        for parity in &parity_names {
            let (writer, reader) = pipe();
            let ticket = self
                .gateway
                .push(StoreRequest::read_all(volume, group, parity, writer))
                .await?;
            parity_readers.push(reader);
            fold_tickets.push(ticket);
        }
        let (fold_writer, fold_reader) = pipe();
        let fold_ticket = self
            .gateway
            .push(StoreRequest::write_all(volume, group, &temp_parity, fold_reader))
            .await?;
        let folded = tokio::spawn(stream_xor(parity_readers, fold_writer, parity_len));
        folded.await??;
        self.wait_all(fold_tickets).await?;
        fold_ticket.wait().await?;

        // Distribute parity shard `i - 1` to group member `i`; the leader
        // keeps the compressed object instead.
        let global = name::global_parity(pid);
        for (i, member) in members.iter().enumerate().skip(1) {
            let (writer, reader) = pipe();
            let ticket = self
                .gateway
                .push(StoreRequest::read_all(volume, group, &parity_names[i - 1], writer))
                .await?;
            let (sent, read) = tokio::join!(
                self.peers.put_chunk(
                    &member.endpoint,
                    member.volume,
                    group,
                    &global,
                    parity_len,
                    reader,
                ),
                ticket.wait()
            );
            sent?;
            read?;
        }
        debug!(job = token.job_id, copies = members.len() - 1, "global parity distributed");

        // Promote the compressed object, then every participating chunk.
        self.gateway
            .rename_chunk(&temp_parity, &global, volume, group)
            .await?;
        undo.follow_rename(volume, &temp_parity, &global);
        for shard in token.participants() {
            self.peers
                .set_chunk_status(
                    &shard.region,
                    shard.encoding_group,
                    &shard.chunk_id,
                    ChunkStatus::GloballyEncoded,
                    Some(token.job_id),
                )
                .await?;
        }

        self.meta.job_finished(token).await?;
        self.meta.set_job_status(token.job_id, JobStatus::Done).await?;

        // The job is committed; leftover per-shard parities are only
        // garbage, so failures here must not trigger rollback.
        for parity in &parity_names {
            if let Err(e) = self.delete_chunk(volume, group, parity).await {
                warn!(chunk = %parity, error = %e, "could not delete transient parity");
            }
        }
        Ok(())
    }

    /// Compensate a failed job: sweep recorded chunks, report the failure,
    /// and restore shard statuses. Best-effort throughout.
    async fn rollback(&self, token: &EncodingToken, undo: UndoLog) {
        undo.run(self.gateway.as_ref()).await;

        if let Err(e) = self.meta.set_job_status(token.job_id, JobStatus::Fail).await {
            error!(job = token.job_id, error = %e, "could not report job failure");
        }
        for source in token.sources() {
            if let Err(e) = self
                .peers
                .set_chunk_status(
                    &source.region,
                    source.encoding_group,
                    &source.chunk_id,
                    ChunkStatus::LocallyEncoded,
                    Some(token.job_id),
                )
                .await
            {
                warn!(chunk = %source.chunk_id, error = %e, "could not restore source status");
            }
        }
        let primary = &token.primary;
        if let Err(e) = self
            .peers
            .set_chunk_status(
                &primary.region,
                primary.encoding_group,
                &primary.chunk_id,
                ChunkStatus::Faulty,
                Some(token.job_id),
            )
            .await
        {
            warn!(chunk = %primary.chunk_id, error = %e, "could not mark primary faulty");
        }
    }

    async fn delete_chunk(
        &self,
        volume: VolumeId,
        group: GroupId,
        chunk: &str,
    ) -> Result<(), EncodeError> {
        let ticket = self
            .gateway
            .push(StoreRequest::delete_real(volume, group, chunk))
            .await?;
        ticket.wait().await?;
        Ok(())
    }

    async fn wait_all(&self, tickets: Vec<StoreTicket>) -> Result<(), EncodeError> {
        for ticket in tickets {
            ticket.wait().await?;
        }
        Ok(())
    }
}

//! Streaming Reed-Solomon encoder.
//!
//! Consumes `k` data pipes and produces `m` parity pipes in lockstep
//! blocks, so memory use is bounded by `(k + m) × block` regardless of
//! chunk size. A systematic code over the whole set: parity byte `j` of
//! every output depends only on byte `j` of every input, so blockwise
//! encoding concatenates to the same result as whole-shard encoding.

use bytes::{Bytes, BytesMut};
use reef_store::{PipeError, PipeReader, PipeWriter};
use tracing::debug;

use crate::error::CodingError;

/// Lockstep block size. Even, as `reed-solomon-simd` requires.
pub const ENCODE_BLOCK_SIZE: usize = 64 * 1024;

/// A pipe reader with carry-over buffering, so lockstep rounds can consume
/// exact block lengths regardless of how the producer sized its writes.
pub(crate) struct BlockReader {
    inner: PipeReader,
    pending: BytesMut,
}

impl BlockReader {
    pub(crate) fn new(inner: PipeReader) -> Self {
        Self {
            inner,
            pending: BytesMut::new(),
        }
    }

    /// Fill `out` with up to `max` bytes. Returns the byte count; 0 means
    /// clean end-of-stream.
    pub(crate) async fn read_block(
        &mut self,
        out: &mut Vec<u8>,
        max: usize,
    ) -> Result<usize, PipeError> {
        out.clear();
        while out.len() < max {
            if !self.pending.is_empty() {
                let take = (max - out.len()).min(self.pending.len());
                out.extend_from_slice(&self.pending.split_to(take));
                continue;
            }
            match self.inner.read().await? {
                Some(block) => self.pending.extend_from_slice(&block),
                None => break,
            }
        }
        Ok(out.len())
    }
}

/// Read one lockstep block from every reader.
///
/// All streams must deliver the same byte count per round; a mismatch means
/// one stream ended early and fails the whole operation.
pub(crate) async fn read_lockstep(
    readers: &mut [BlockReader],
    blocks: &mut [Vec<u8>],
    max: usize,
) -> Result<usize, CodingError> {
    let mut round_len: Option<usize> = None;
    for (i, reader) in readers.iter_mut().enumerate() {
        let n = reader.read_block(&mut blocks[i], max).await?;
        match round_len {
            None => round_len = Some(n),
            Some(expected) if expected != n => {
                return Err(CodingError::ShortStream {
                    stream: i,
                    expected,
                    got: n,
                });
            }
            Some(_) => {}
        }
    }
    Ok(round_len.unwrap_or(0))
}

/// Close every output pipe with the given error, releasing blocked consumers.
pub(crate) async fn fail_outputs(outputs: Vec<PipeWriter>, err: &CodingError) {
    let cause = PipeError::upstream(err);
    for out in outputs {
        out.fail(cause.clone()).await;
    }
}

/// Encode `k` data streams into `m` Reed-Solomon parity streams.
///
/// Consumes every input to end-of-stream and writes every parity stream in
/// full, returning the per-stream byte count. If any input errors or closes
/// early, the error is propagated to every output pipe and the whole
/// operation fails. The encoder holds no state across calls.
pub async fn stream_encode(
    k: usize,
    m: usize,
    inputs: Vec<PipeReader>,
    outputs: Vec<PipeWriter>,
) -> Result<u64, CodingError> {
    if k == 0 || m == 0 || inputs.len() != k || outputs.len() != m {
        let err = CodingError::BadGeometry {
            data: inputs.len(),
            parity: outputs.len(),
        };
        fail_outputs(outputs, &err).await;
        return Err(err);
    }

    let mut readers: Vec<BlockReader> = inputs.into_iter().map(BlockReader::new).collect();
    let mut outputs = outputs;
    let mut blocks: Vec<Vec<u8>> = vec![Vec::with_capacity(ENCODE_BLOCK_SIZE); k];
    let mut total: u64 = 0;

    loop {
        let len = match read_lockstep(&mut readers, &mut blocks, ENCODE_BLOCK_SIZE).await {
            Ok(0) => break,
            Ok(len) => len,
            Err(e) => {
                fail_outputs(outputs, &e).await;
                return Err(e);
            }
        };

        // Pad the round to an even length; the pad byte's parity is never
        // emitted downstream.
        let padded = if len % 2 == 0 { len } else { len + 1 };
        for block in &mut blocks {
            block.resize(padded, 0);
        }

        let originals: Vec<&[u8]> = blocks.iter().map(|b| b.as_slice()).collect();
        let recovery = match reed_solomon_simd::encode(k, m, &originals) {
            Ok(recovery) => recovery,
            Err(e) => {
                let e = CodingError::ReedSolomon(e);
                fail_outputs(outputs, &e).await;
                return Err(e);
            }
        };

        let mut write_err = None;
        for (i, rec) in recovery.iter().enumerate() {
            if let Err(e) = outputs[i].write(Bytes::copy_from_slice(&rec[..len])).await {
                // A consumer went away; release the rest and abort.
                write_err = Some(CodingError::Pipe(e));
                break;
            }
        }
        if let Some(e) = write_err {
            fail_outputs(outputs, &e).await;
            return Err(e);
        }

        total += len as u64;
    }

    debug!(k, m, total, "streamed parity encode complete");
    // Dropping the writers delivers clean end-of-stream to every consumer.
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use reef_store::pipe;

    fn test_data(seed: u32, size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut state = seed;
        for _ in 0..size {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            data.push((state >> 16) as u8);
        }
        data
    }

    /// Drive stream_encode over in-memory inputs, returning the parity buffers.
    async fn encode_buffers(k: usize, m: usize, data: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let mut writers = Vec::new();
        let mut readers = Vec::new();
        for _ in 0..k {
            let (w, r) = pipe();
            writers.push(w);
            readers.push(r);
        }
        let mut parity_writers = Vec::new();
        let mut collectors = Vec::new();
        for _ in 0..m {
            let (w, r) = pipe();
            parity_writers.push(w);
            collectors.push(tokio::spawn(r.read_to_end()));
        }
        for (mut w, d) in writers.into_iter().zip(data.iter().cloned()) {
            tokio::spawn(async move {
                // Deliver in odd-sized writes to exercise carry-over buffering.
                for block in d.chunks(777) {
                    if w.write(Bytes::copy_from_slice(block)).await.is_err() {
                        return;
                    }
                }
            });
        }
        stream_encode(k, m, readers, parity_writers).await.unwrap();
        let mut parities = Vec::new();
        for c in collectors {
            parities.push(c.await.unwrap().unwrap());
        }
        parities
    }

    #[tokio::test]
    async fn test_encode_produces_equal_length_parity() {
        let data: Vec<Vec<u8>> = (0..6).map(|i| test_data(i, 4096)).collect();
        let parities = encode_buffers(6, 2, &data).await;
        assert_eq!(parities.len(), 2);
        for p in &parities {
            assert_eq!(p.len(), 4096);
        }
    }

    #[tokio::test]
    async fn test_roundtrip_any_k_of_k_plus_m() {
        let k = 3;
        let m = 2;
        let size = 2048;
        let data: Vec<Vec<u8>> = (0..k as u32).map(|i| test_data(i, size)).collect();
        let parities = encode_buffers(k, m, &data).await;

        let mut all: Vec<(usize, Vec<u8>)> = data.iter().cloned().enumerate().collect();
        for (i, p) in parities.iter().cloned().enumerate() {
            all.push((k + i, p));
        }

        // Drop two shards (one data, one parity); decode must still succeed.
        let subset: Vec<(usize, Vec<u8>)> = all
            .iter()
            .filter(|(i, _)| *i != 1 && *i != 4)
            .cloned()
            .collect();
        assert_eq!(subset.len(), k);
        let restored = decode(k, m, &subset, size * k).unwrap();
        let expected: Vec<u8> = data.concat();
        assert_eq!(restored, expected);
    }

    #[tokio::test]
    async fn test_odd_length_streams() {
        let data: Vec<Vec<u8>> = (0..3).map(|i| test_data(i, 1023)).collect();
        let parities = encode_buffers(3, 1, &data).await;
        assert_eq!(parities[0].len(), 1023);
    }

    #[tokio::test]
    async fn test_input_failure_propagates_to_outputs() {
        let (mut w0, r0) = pipe();
        let (w1, r1) = pipe();
        let (pw, pr) = pipe();
        let collector = tokio::spawn(pr.read_to_end());

        let encode = tokio::spawn(stream_encode(2, 1, vec![r0, r1], vec![pw]));
        w0.write(Bytes::from_static(b"some")).await.unwrap();
        w1.fail(PipeError::upstream("source region unreachable"))
            .await;
        drop(w0);

        assert!(encode.await.unwrap().is_err());
        assert!(collector.await.unwrap().is_err(), "parity consumer must see the failure");
    }

    #[tokio::test]
    async fn test_uneven_streams_rejected() {
        let mut readers = Vec::new();
        for i in 0..2u32 {
            let (mut w, r) = pipe();
            readers.push(r);
            let data = test_data(i, if i == 0 { 512 } else { 300 });
            tokio::spawn(async move {
                let _ = w.write(Bytes::from(data)).await;
            });
        }
        let (pw, pr) = pipe();
        drop(tokio::spawn(pr.read_to_end()));
        let err = stream_encode(2, 1, readers, vec![pw]).await.unwrap_err();
        assert!(matches!(err, CodingError::ShortStream { .. }));
    }
}

//! Synchronous byte-stream pair with close-with-error semantics.
//!
//! A pipe connects exactly one producer to exactly one consumer. Each write
//! blocks until the consumer drains it (the channel has capacity 1), so at
//! most two blocks per stream are ever resident. Dropping the writer is a
//! clean end-of-stream; [`PipeWriter::fail`] instead delivers the producer's
//! error to the reader, releasing a consumer that would otherwise wait
//! forever. Dropping the reader makes the next write fail with
//! [`PipeError::Closed`], releasing a blocked producer.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Errors carried across a pipe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipeError {
    /// The other end of the pipe was dropped.
    #[error("pipe closed")]
    Closed,

    /// The producer failed and closed the pipe with its error.
    #[error("upstream failed: {0}")]
    Upstream(String),
}

impl PipeError {
    /// Wrap an arbitrary producer error for propagation to the consumer.
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        PipeError::Upstream(err.to_string())
    }
}

/// Create a connected writer/reader pair.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(1);
    (PipeWriter { tx }, PipeReader { rx })
}

/// The producing end of a pipe.
#[derive(Debug)]
pub struct PipeWriter {
    tx: mpsc::Sender<Result<Bytes, PipeError>>,
}

impl PipeWriter {
    /// Write one block, blocking until the consumer has drained the previous
    /// one. Fails with [`PipeError::Closed`] if the reader is gone.
    pub async fn write(&mut self, data: Bytes) -> Result<(), PipeError> {
        self.tx.send(Ok(data)).await.map_err(|_| PipeError::Closed)
    }

    /// Close the pipe, delivering `err` to the consumer.
    ///
    /// A no-op if the reader is already gone.
    pub async fn fail(self, err: PipeError) {
        let _ = self.tx.send(Err(err)).await;
    }
}

/// The consuming end of a pipe.
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::Receiver<Result<Bytes, PipeError>>,
}

impl PipeReader {
    /// Read the next block. `Ok(None)` is a clean end-of-stream.
    pub async fn read(&mut self) -> Result<Option<Bytes>, PipeError> {
        match self.rx.recv().await {
            None => Ok(None),
            Some(Ok(data)) => Ok(Some(data)),
            Some(Err(e)) => Err(e),
        }
    }

    /// Drain the remainder of the stream into a single buffer.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>, PipeError> {
        let mut buf = Vec::new();
        while let Some(block) = self.read().await? {
            buf.extend_from_slice(&block);
        }
        Ok(buf)
    }

    /// Expose the reader as a [`futures`](futures_core) stream of blocks,
    /// e.g. to feed an HTTP request body.
    pub fn into_stream(self) -> ReceiverStream<Result<Bytes, PipeError>> {
        ReceiverStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let (mut w, mut r) = pipe();
        let writer = tokio::spawn(async move {
            w.write(Bytes::from_static(b"one")).await.unwrap();
            w.write(Bytes::from_static(b"two")).await.unwrap();
        });
        assert_eq!(r.read().await.unwrap().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(r.read().await.unwrap().unwrap(), Bytes::from_static(b"two"));
        writer.await.unwrap();
        assert_eq!(r.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_writer_is_clean_eof() {
        let (w, mut r) = pipe();
        drop(w);
        assert_eq!(r.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fail_releases_reader() {
        let (w, mut r) = pipe();
        let reader = tokio::spawn(async move { r.read().await });
        w.fail(PipeError::upstream("disk on fire")).await;
        let got = reader.await.unwrap();
        assert_eq!(got, Err(PipeError::Upstream("disk on fire".to_string())));
    }

    #[tokio::test]
    async fn test_drop_reader_releases_writer() {
        let (mut w, r) = pipe();
        drop(r);
        assert_eq!(
            w.write(Bytes::from_static(b"nobody home")).await,
            Err(PipeError::Closed)
        );
    }

    #[tokio::test]
    async fn test_read_to_end_collects_blocks() {
        let (mut w, r) = pipe();
        tokio::spawn(async move {
            w.write(Bytes::from_static(b"ab")).await.unwrap();
            w.write(Bytes::from_static(b"cd")).await.unwrap();
        });
        assert_eq!(r.read_to_end().await.unwrap(), b"abcd");
    }
}

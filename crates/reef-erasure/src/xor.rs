//! Lockstep byte-wise XOR folding.
//!
//! Reduces `n` equal-length parity streams into one object whose byte at
//! offset `i` is the XOR of every input's byte at offset `i`. This mirrors
//! how an encoding group always presents a single parity chunk regardless
//! of its shard count.

use bytes::Bytes;
use reef_store::{PipeError, PipeReader, PipeWriter};

use crate::error::CodingError;
use crate::stream::{read_lockstep, BlockReader, ENCODE_BLOCK_SIZE};

/// XOR `src` into `acc` in place. Lengths must match.
pub fn xor_into(acc: &mut [u8], src: &[u8]) {
    debug_assert_eq!(acc.len(), src.len());
    for (a, s) in acc.iter_mut().zip(src) {
        *a ^= *s;
    }
}

/// Fold `inputs` into `output` by byte-wise XOR, for exactly `len` bytes
/// per stream.
///
/// Interleaves reads from every input in lockstep, so it is single-threaded
/// and synchronous by construction. A stream ending before `len` bytes, or
/// erroring, fails the whole fold; the error is propagated to the output.
pub async fn stream_xor(
    inputs: Vec<PipeReader>,
    mut output: PipeWriter,
    len: u64,
) -> Result<(), CodingError> {
    if inputs.is_empty() {
        let err = CodingError::BadGeometry { data: 0, parity: 0 };
        output.fail(PipeError::upstream(&err)).await;
        return Err(err);
    }

    let n = inputs.len();
    let mut readers: Vec<BlockReader> = inputs.into_iter().map(BlockReader::new).collect();
    let mut blocks: Vec<Vec<u8>> = vec![Vec::with_capacity(ENCODE_BLOCK_SIZE); n];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(ENCODE_BLOCK_SIZE as u64) as usize;
        let got = match read_lockstep(&mut readers, &mut blocks, want).await {
            Ok(got) => got,
            Err(e) => {
                output.fail(PipeError::upstream(&e)).await;
                return Err(e);
            }
        };
        if got < want {
            let e = CodingError::ShortStream {
                stream: 0,
                expected: want,
                got,
            };
            output.fail(PipeError::upstream(&e)).await;
            return Err(e);
        }

        let mut acc = std::mem::take(&mut blocks[0]);
        for block in &blocks[1..] {
            xor_into(&mut acc, block);
        }
        let written = output.write(Bytes::from(acc)).await;
        blocks[0] = Vec::with_capacity(ENCODE_BLOCK_SIZE);
        written?;

        remaining -= want as u64;
    }

    Ok(())
}

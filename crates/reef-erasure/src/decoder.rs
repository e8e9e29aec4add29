//! Buffer-level Reed-Solomon decoder.
//!
//! Reconstructs the concatenated data streams from any `k` (or more) of the
//! `k + m` shards produced by [`stream_encode`](crate::stream_encode).
//! Used by recovery and by tests; the encode path never needs it.

use tracing::debug;

use crate::error::CodingError;

/// Decode original data from a subset of shards.
///
/// `shards` holds at least `k` `(index, data)` pairs where index `0..k`
/// are data shards and `k..k+m` parity shards; all must be equal length.
/// `original_size` is the unpadded total of the concatenated data shards.
pub fn decode(
    k: usize,
    m: usize,
    shards: &[(usize, Vec<u8>)],
    original_size: usize,
) -> Result<Vec<u8>, CodingError> {
    if shards.len() < k {
        return Err(CodingError::NotEnoughShards {
            needed: k,
            got: shards.len(),
        });
    }

    let shard_size = shards[0].1.len();
    let padded_size = if shard_size % 2 == 0 {
        shard_size
    } else {
        shard_size + 1
    };

    let padded: Vec<(usize, Vec<u8>)> = shards
        .iter()
        .map(|(i, data)| {
            let mut d = data.clone();
            d.resize(padded_size, 0);
            (*i, d)
        })
        .collect();

    let mut originals: Vec<(usize, &[u8])> = Vec::new();
    let mut recovery: Vec<(usize, &[u8])> = Vec::new();
    for (index, data) in &padded {
        if *index < k {
            originals.push((*index, data.as_slice()));
        } else {
            recovery.push((*index - k, data.as_slice()));
        }
    }

    debug!(
        k,
        m,
        originals = originals.len(),
        recovery = recovery.len(),
        original_size,
        "decoding from shards"
    );

    let mut result = vec![0u8; k * shard_size];

    // Place the data shards we already have.
    for (index, data) in &padded {
        if *index < k {
            let start = index * shard_size;
            result[start..start + shard_size].copy_from_slice(&data[..shard_size]);
        }
    }

    if originals.len() < k {
        // Need RS decode to recover the missing data shards.
        let restored = reed_solomon_simd::decode(k, m, originals, recovery)?;
        for (idx, data) in &restored {
            let start = idx * shard_size;
            result[start..start + shard_size].copy_from_slice(&data[..shard_size]);
        }
    }

    result.truncate(original_size);
    Ok(result)
}

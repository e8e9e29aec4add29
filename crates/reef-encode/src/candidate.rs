//! Candidate-chunk selection.

use reef_store::{StoreError, StoreGateway};
use reef_types::{name, GroupId, VolumeId};
use tracing::warn;

/// Pick the next chunk eligible for global encoding on `volume`.
///
/// Returns the bare chunk id of the first chunk still in locally-encoded
/// state, or `None` when the volume has no candidate. An empty volume is
/// not an error.
pub async fn next_candidate(
    gateway: &dyn StoreGateway,
    volume: VolumeId,
    encoding_group: GroupId,
) -> Result<Option<String>, StoreError> {
    let Some(found) = gateway.get_non_coded_chunk(volume, encoding_group).await? else {
        return Ok(None);
    };
    match name::strip_locally_encoded(&found) {
        Some(id) => Ok(Some(id.to_string())),
        None => {
            warn!(chunk = %found, %volume, "candidate scan returned a non-candidate name");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_store::MemoryGateway;

    #[tokio::test]
    async fn test_candidate_strips_prefix() {
        let gw = MemoryGateway::new();
        gw.insert_chunk(VolumeId(0), GroupId(1), "G_00001", vec![]);
        gw.insert_chunk(VolumeId(0), GroupId(1), "L_00042", vec![]);
        let got = next_candidate(&gw, VolumeId(0), GroupId(1)).await.unwrap();
        assert_eq!(got, Some("00042".to_string()));
    }

    #[tokio::test]
    async fn test_no_candidate_is_none() {
        let gw = MemoryGateway::new();
        gw.insert_chunk(VolumeId(0), GroupId(1), "G_00001", vec![]);
        let got = next_candidate(&gw, VolumeId(0), GroupId(1)).await.unwrap();
        assert_eq!(got, None);
    }
}

//! Chunk naming convention.
//!
//! Chunk names carry their lifecycle as a prefix letter; the formats below
//! are part of the wire contract between regions and must not change:
//!
//! - `L_<id>` — locally-encoded source chunk
//! - `T_<region>_<id>_<frag>` — temporary download of fragment `frag`
//! - `T_<pid>_<i>` — temporary per-shard global parity
//! - `T_<pid>` — temporary compressed (XOR) global parity
//! - `G_<pid>` — finished global parity

/// Name of a locally-encoded source chunk.
pub fn locally_encoded(chunk_id: &str) -> String {
    format!("L_{chunk_id}")
}

/// Name of a temporary chunk holding one downloaded source fragment.
pub fn temp_download(region: &str, chunk_id: &str, fragment: usize) -> String {
    format!("T_{region}_{chunk_id}_{fragment}")
}

/// Name of a temporary per-shard global parity chunk.
pub fn temp_shard_parity(primary_chunk_id: &str, shard: usize) -> String {
    format!("T_{primary_chunk_id}_{shard}")
}

/// Name of the temporary compressed parity object.
pub fn temp_parity(primary_chunk_id: &str) -> String {
    format!("T_{primary_chunk_id}")
}

/// Name of the finished global parity object.
pub fn global_parity(primary_chunk_id: &str) -> String {
    format!("G_{primary_chunk_id}")
}

/// Extract the bare chunk id from a locally-encoded chunk name.
///
/// Returns `None` if the name does not carry the `L_` prefix.
pub fn strip_locally_encoded(name: &str) -> Option<&str> {
    name.strip_prefix("L_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_formats() {
        assert_eq!(locally_encoded("00012"), "L_00012");
        assert_eq!(temp_download("apex", "00012", 1), "T_apex_00012_1");
        assert_eq!(temp_shard_parity("00099", 0), "T_00099_0");
        assert_eq!(temp_parity("00099"), "T_00099");
        assert_eq!(global_parity("00099"), "G_00099");
    }

    #[test]
    fn test_strip_locally_encoded() {
        assert_eq!(strip_locally_encoded("L_00012"), Some("00012"));
        assert_eq!(strip_locally_encoded("G_00012"), None);
    }
}

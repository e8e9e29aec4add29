//! TOML configuration for the Reef daemon.

use std::path::{Path, PathBuf};

use reef_encode::{GroupMember, StaticGroupView};
use reef_types::{EncodeConfig, GroupId, VolumeId};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Node identity and addresses.
    pub node: NodeSection,
    /// Metadata service settings.
    pub meta: MetaSection,
    /// Global-encoding parameters.
    pub encoding: EncodingSection,
    /// Encoding-group layout, one entry per group this node leads or serves.
    #[serde(rename = "group")]
    pub groups: Vec<GroupSection>,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[node]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Stable region name; appears in temporary chunk names.
    pub region: String,
    /// Address for the chunk-transfer HTTP API.
    pub listen_addr: String,
    /// Directory for chunk files.
    pub data_dir: PathBuf,
    /// Storage backend: `"file"` (default) or `"memory"`.
    pub backend: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            region: "local".to_string(),
            listen_addr: "0.0.0.0:4830".to_string(),
            data_dir: PathBuf::from(".reef"),
            backend: "file".to_string(),
        }
    }
}

/// `[meta]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetaSection {
    /// Base URL of the metadata service.
    pub endpoint: String,
    /// Request timeout in seconds, for metadata and peer calls alike.
    pub timeout_secs: u64,
}

impl Default for MetaSection {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:4900".to_string(),
            timeout_secs: 30,
        }
    }
}

/// `[encoding]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncodingSection {
    /// Shards per encoding group.
    pub local_shards: usize,
    /// Chunk size in bytes.
    pub chunk_size: u64,
}

impl Default for EncodingSection {
    fn default() -> Self {
        let defaults = EncodeConfig::default();
        Self {
            local_shards: defaults.local_shards,
            chunk_size: defaults.chunk_size,
        }
    }
}

/// One `[[group]]` entry.
#[derive(Debug, Deserialize)]
pub struct GroupSection {
    /// Encoding group id.
    pub id: u32,
    /// Ordered member volumes; the first entry is the group leader.
    pub members: Vec<MemberEntry>,
}

/// One member volume within a `[[group]]` entry.
#[derive(Debug, Deserialize)]
pub struct MemberEntry {
    /// Volume id.
    pub volume: u32,
    /// Base URL of the node hosting the volume.
    pub endpoint: String,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Erasure parameters for the encoder.
    pub fn encode_config(&self) -> EncodeConfig {
        EncodeConfig {
            local_shards: self.encoding.local_shards,
            chunk_size: self.encoding.chunk_size,
        }
    }

    /// Group layout as a cluster-map view.
    pub fn group_view(&self) -> StaticGroupView {
        let mut view = StaticGroupView::new();
        for group in &self.groups {
            let members = group
                .members
                .iter()
                .map(|m| GroupMember {
                    volume: VolumeId(m.volume),
                    endpoint: m.endpoint.clone(),
                })
                .collect();
            view.insert(GroupId(group.id), members);
        }
        view
    }
}

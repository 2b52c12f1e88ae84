//! # Node Configuration
//!
//! Typed, serde-deserializable configuration covering the sections
//! enumerated in §6: `bitcoin`, `node`, `network`, `database`, `log`.
//! Loaded layered: built-in [`Default`]s, then an optional TOML file, then
//! `BN_`-prefixed environment variable overrides for the fields operators
//! most commonly need to tweak without editing a file.

use serde::{Deserialize, Serialize};
use shared_types::entities::Hash;
use std::path::{Path, PathBuf};

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub bitcoin: BitcoinConfig,
    pub node: NodeSection,
    pub network: NetworkConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bitcoin: BitcoinConfig::default(),
            node: NodeSection::default(),
            network: NetworkConfig::default(),
            database: DatabaseConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// A hard-coded checkpoint entry, `(height, hash)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointEntry {
    pub height: u64,
    pub hash: Hash,
}

/// Consensus parameters (§6: "`bitcoin`: `{genesis_block, checkpoints,
/// minimum_work, milestone, ...}`"). The consensus predicates themselves
/// are an external collaborator (§1); this section only carries the
/// constants the organize chaser's storability gates consult (§4.3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BitcoinConfig {
    pub genesis_block: Hash,
    pub checkpoints: Vec<CheckpointEntry>,
    pub minimum_work: u128,
    pub milestone: Option<CheckpointEntry>,
    pub subsidy_interval_blocks: u64,
    pub initial_subsidy: u64,
    pub timestamp_limit_seconds: u64,
    pub proof_of_work_limit: u32,
    pub forks: ForksConfig,
}

impl Default for BitcoinConfig {
    fn default() -> Self {
        Self {
            genesis_block: [0u8; 32],
            checkpoints: Vec::new(),
            minimum_work: 0,
            milestone: None,
            subsidy_interval_blocks: 210_000,
            initial_subsidy: 50_0000_0000,
            timestamp_limit_seconds: 7_200,
            proof_of_work_limit: 0x1d00_ffff,
            forks: ForksConfig::default(),
        }
    }
}

/// Soft-fork activation heights, named after the BIPs they gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForksConfig {
    pub bip16: u64,
    pub bip34: u64,
    pub bip65: u64,
    pub bip66: u64,
    pub bip68: u64,
    pub bip141: u64,
    pub bip9: u64,
}

/// Node-level pipeline tuning (§6: "`node`: `{headers_first,
/// maximum_concurrency, ...}`"), consumed by the check/validate chasers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub headers_first: bool,
    pub maximum_concurrency: usize,
    pub maximum_height: u64,
    pub maximum_inventory: usize,
    pub currency_window_minutes: u64,
    pub allowed_deviation: u64,
    pub concurrent_validation: bool,
    pub maximum_backlog: usize,
    pub threads: usize,
    pub priority: i8,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            headers_first: true,
            maximum_concurrency: 8_000,
            maximum_height: u64::MAX,
            maximum_inventory: 500,
            currency_window_minutes: 60,
            allowed_deviation: 2 * 60 * 60,
            concurrent_validation: true,
            maximum_backlog: 64,
            threads: 0,
            priority: 0,
        }
    }
}

/// Peer connection limits (§6: "`network`: `{outbound_connections, ...}`").
/// The transport itself is outside the core's scope (§1); these fields
/// bound what the channel protocol layer fans out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub outbound_connections: usize,
    pub inbound_connections: usize,
    pub services_min: u64,
    pub services_max: u64,
    pub channel_heartbeat_minutes: u64,
    pub channel_inactivity_minutes: u64,
    pub enable_ipv6: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            outbound_connections: 8,
            inbound_connections: 125,
            services_min: 0,
            services_max: u64::MAX,
            channel_heartbeat_minutes: 5,
            channel_inactivity_minutes: 30,
            enable_ipv6: true,
        }
    }
}

/// Per-table store sizing (§6: "`database`: per-table `{buckets, size,
/// rate}` plus `{path}`"). The reference store adapter (§4.2.1) does not
/// read these at runtime; they are carried so a persistent adapter has
/// somewhere to source its table geometry from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TableConfig {
    pub buckets: u32,
    pub size: u64,
    pub rate: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            buckets: 97,
            size: 1 << 20,
            rate: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub header: TableConfig,
    pub candidate: TableConfig,
    pub confirmed: TableConfig,
    pub tx: TableConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            header: TableConfig::default(),
            candidate: TableConfig::default(),
            confirmed: TableConfig::default(),
            tx: TableConfig::default(),
        }
    }
}

/// Logging sinks and level toggles (§6: "`log`: `{path, maximum_size,
/// log_file1, log_file2, events_file, toggles}`"). `toggles` names the
/// single-letter categories the control menu can flip at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub path: PathBuf,
    pub maximum_size: u64,
    pub log_file1: String,
    pub log_file2: String,
    pub events_file: String,
    pub toggles: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./log"),
            maximum_size: 10 * 1024 * 1024,
            log_file1: "debug.log".to_string(),
            log_file2: "debug-2.log".to_string(),
            events_file: "events.log".to_string(),
            toggles: "ansprf".to_string(),
        }
    }
}

/// Failures while loading or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl NodeConfig {
    /// Loads configuration layered: built-in defaults, then `path` (if
    /// given and present), then `BN_`-prefixed environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies `BN_`-prefixed environment variable overrides (§6) on top
    /// of whatever defaults/file produced so far. Only the fields an
    /// operator is most likely to need to override without editing a
    /// file are covered; the rest stay file/default-driven.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("BN_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("BN_LOG_PATH") {
            self.log.path = PathBuf::from(path);
        }
        if let Ok(value) = std::env::var("BN_NODE_MAXIMUM_HEIGHT") {
            if let Ok(height) = value.parse() {
                self.node.maximum_height = height;
            }
        }
        if let Ok(value) = std::env::var("BN_NETWORK_OUTBOUND_CONNECTIONS") {
            if let Ok(count) = value.parse() {
                self.network.outbound_connections = count;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_mainnet_reasonable_values() {
        let config = NodeConfig::default();
        assert_eq!(config.bitcoin.subsidy_interval_blocks, 210_000);
        assert_eq!(config.node.maximum_inventory, 500);
        assert_eq!(config.network.outbound_connections, 8);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = NodeConfig::load(Some(Path::new("/nonexistent/bn.toml"))).expect("load");
        assert_eq!(config.node.maximum_concurrency, 8_000);
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join("bn-node-config-test.toml");
        std::fs::write(&path, "[node]\nmaximum_concurrency = 42\n").expect("write config");

        let config = NodeConfig::load(Some(&path)).expect("load");
        assert_eq!(config.node.maximum_concurrency, 42);

        std::fs::remove_file(&path).ok();
    }
}

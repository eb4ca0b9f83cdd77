use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config version {0} is newer than this build understands")]
    UnknownVersion(u32),
}

/// Schema version this build knows how to migrate up to. Bump alongside
/// a new arm in `NodeConfig::migrate`; every step must stay idempotent.
pub const CURRENT_CONFIG_VERSION: u32 = 3;

/// Recognised options (spec.md §6), plus the ambient fields the teacher
/// always carries alongside domain config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub version: u32,

    /// Floor below which sends are ignored by wallets but still processed
    /// by the ledger.
    pub receive_minimum: u128,
    /// Adjusts the conserved-supply invariant (spec §8).
    pub inactive_supply: u128,
    pub password_fanout: u32,

    pub io_threads: usize,
    pub work_threads: usize,

    pub bootstrap_fraction_numerator: u32,
    pub creation_rebroadcast: u32,
    pub rebroadcast_delay: u32,
    pub packet_delay_microseconds: u32,

    pub preconfigured_peers: Vec<String>,
    pub preconfigured_representatives: Vec<String>,
    pub work_peers: Vec<String>,

    /// Gap cache bound (spec §4.D `bounded_backlog`).
    pub bounded_backlog: usize,
    /// Active elections table cap (spec §4.E).
    pub max_active_elections: usize,
    pub election_timeout_secs: u64,
    pub quorum_numerator: u128,
    pub quorum_denominator: u128,
    /// Distinct peers asking about the same unknown hash before bootstrap
    /// is triggered (spec §4.D).
    pub bootstrap_trigger_peers: usize,
    pub bootstrap_backoff_ceiling_secs: u64,

    /// Where the sled store lives on disk.
    pub data_path: PathBuf,
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            version: CURRENT_CONFIG_VERSION,
            receive_minimum: 1,
            inactive_supply: 0,
            password_fanout: 1024,
            io_threads: 4,
            work_threads: 1,
            bootstrap_fraction_numerator: 1,
            creation_rebroadcast: 2,
            rebroadcast_delay: 3,
            packet_delay_microseconds: 500,
            preconfigured_peers: Vec::new(),
            preconfigured_representatives: Vec::new(),
            work_peers: Vec::new(),
            bounded_backlog: 65_536,
            max_active_elections: 50_000,
            election_timeout_secs: 300,
            quorum_numerator: 1,
            quorum_denominator: 2,
            bootstrap_trigger_peers: 3,
            bootstrap_backoff_ceiling_secs: 300,
            data_path: PathBuf::from("./rai-data"),
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &std::path::Path) -> Result<NodeConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: NodeConfig = toml::from_str(&text)?;
        config.migrate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Run the versioned migration chain `1 -> 2 -> ... -> current`
    /// (spec.md §6 "version"). Each step is idempotent; a version newer
    /// than this build knows about is a hard error, never a panic
    /// (Design Note: "Exceptions in config upgrade").
    fn migrate(&mut self) -> Result<(), ConfigError> {
        if self.version > CURRENT_CONFIG_VERSION {
            return Err(ConfigError::UnknownVersion(self.version));
        }
        if self.version == 0 {
            // 0 -> 1: baseline, nothing to backfill beyond the defaults
            // `#[serde(default)]` already supplied for missing fields.
            self.version = 1;
        }
        if self.version == 1 {
            // 1 -> 2: introduced the election/quorum fields; a config
            // written before they existed gets the spec defaults.
            self.version = 2;
        }
        if self.version == 2 {
            // 2 -> 3: introduced bootstrap backoff/trigger tuning.
            self.version = 3;
        }
        Ok(())
    }
}

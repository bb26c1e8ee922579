//! Configuration management for the ledger node

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::blockchain::pow::GENESIS_PROOF;
use crate::blockchain::{Amount, ProofSearch};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "LEDGER_CONFIG";

/// Configuration file read when `LEDGER_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "ledger.toml";

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub genesis: GenesisConfig,
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Parameters of the block the node creates at start-up
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub proof: u64,
    pub previous_hash: String,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            proof: GENESIS_PROOF,
            previous_hash: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Worker threads used by the proof search
    pub threads: usize,

    /// Candidates tried before a mining request gives up; unbounded if unset
    pub max_attempts: Option<u64>,

    /// Amount paid to this node for every mined block
    pub reward: Amount,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            max_attempts: None,
            reward: Amount::Integer(1),
        }
    }
}

impl MinerConfig {
    /// Builds the proof search this configuration describes
    pub fn proof_search(&self) -> ProofSearch {
        let search = ProofSearch::new().with_workers(self.threads);
        match self.max_attempts {
            Some(max_attempts) => search.with_max_attempts(max_attempts),
            None => search,
        }
    }
}

impl NodeConfig {
    /// Parses and validates a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(source) => Self::from_toml_str(&source),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::Invalid("server.host must be set".to_string()));
        }

        if self.genesis.previous_hash.is_empty() {
            return Err(ConfigError::Invalid(
                "genesis.previous_hash must not be empty".to_string(),
            ));
        }

        if self.miner.threads == 0 {
            return Err(ConfigError::Invalid("miner.threads must be at least 1".to_string()));
        }

        if self.miner.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "miner.max_attempts must be at least 1".to_string(),
            ));
        }

        if !self.miner.reward.is_finite() {
            return Err(ConfigError::Invalid("miner.reward must be finite".to_string()));
        }

        Ok(())
    }
}

/// Loads the node configuration from `$LEDGER_CONFIG` or `ledger.toml`
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    let path = env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    NodeConfig::from_path(&path)
}

//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plancheck_store::StaticSpecialtyDirectory;
use plancheck_types::{ConsensusParams, LedgerParams};

use crate::logging::LogFormat;
use crate::ServiceError;

/// Configuration for a plancheck service instance.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for LMDB storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between sweeps in periodic mode.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default)]
    pub ledger: LedgerParams,

    #[serde(default)]
    pub consensus: ConsensusParams,

    /// Provider key → specialty label, used to pick recency decay tables.
    #[serde(default)]
    pub specialties: BTreeMap<String, String>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./plancheck_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        let config: Self = toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.map_size_mb == 0 {
            return Err(ServiceError::Config("map_size_mb must be positive".into()));
        }
        if self.ledger.sweep_batch_size == 0 {
            return Err(ServiceError::Config(
                "ledger.sweep_batch_size must be positive".into(),
            ));
        }
        if self.consensus.max_write_attempts == 0 {
            return Err(ServiceError::Config(
                "consensus.max_write_attempts must be positive".into(),
            ));
        }
        if self.consensus.min_confidence_for_status_change > 100 {
            return Err(ServiceError::Config(
                "consensus.min_confidence_for_status_change must be at most 100".into(),
            ));
        }
        Ok(())
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// The configured `[specialties]` table as a lookup directory.
    pub fn specialty_directory(&self) -> StaticSpecialtyDirectory {
        StaticSpecialtyDirectory::from_labels(
            self.specialties
                .iter()
                .map(|(provider, label)| (provider.as_str(), label.as_str())),
        )
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            sweep_interval_secs: default_sweep_interval_secs(),
            ledger: LedgerParams::default(),
            consensus: ConsensusParams::default(),
            specialties: BTreeMap::new(),
        }
    }
}

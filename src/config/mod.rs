//! Configuration for the snapshot staging layer.
//!
//! Loaded from an optional TOML file with an environment-variable overlay on
//! top (`SNAPSTAGE_` prefix, highest priority), then validated.


use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_BYTES_PER_SYNC;
use crate::constants::DEFAULT_WRITE_RATE_BYTES_PER_SEC;
use crate::Error;
use crate::Result;

/// Tuning knobs for snapshot staging writes.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SnapshotStagingConfig {
    /// Aggregate admission rate for bulk staging writes, in bytes per
    /// second, shared across every scratch of the store. `0` disables rate
    /// limiting.
    #[serde(default = "default_write_rate_bytes_per_sec")]
    pub write_rate_bytes_per_sec: u64,

    /// Periodic-sync threshold handed to files staged through `write_sst`.
    /// Periodic syncing smooths write bursts; explicit syncs still gate
    /// durability.
    #[serde(default = "default_bytes_per_sync")]
    pub bytes_per_sync: usize,
}

impl Default for SnapshotStagingConfig {
    fn default() -> Self {
        Self {
            write_rate_bytes_per_sec: default_write_rate_bytes_per_sec(),
            bytes_per_sync: default_bytes_per_sync(),
        }
    }
}

impl SnapshotStagingConfig {
    /// Loads configuration with priority:
    /// 1. Hardcoded defaults
    /// 2. Optional TOML file
    /// 3. Environment variables (highest priority)
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SNAPSTAGE")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates staging write settings.
    pub fn validate(&self) -> Result<()> {
        if self.bytes_per_sync == 0 {
            return Err(Error::Config(ConfigError::Message(
                "bytes_per_sync must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_write_rate_bytes_per_sec() -> u64 {
    DEFAULT_WRITE_RATE_BYTES_PER_SEC
}

fn default_bytes_per_sync() -> usize {
    DEFAULT_BYTES_PER_SYNC
}

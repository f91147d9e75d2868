//! Configuration files.
//!
//! The node reads a single TOML file with a `[builder]`, a `[cache]` and a `[gc]` section. Every
//! key is optional and falls back to the engine's defaults.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use ember_primitives::constants::{
    EMBER_CLIENT_VERSION, ETHEREUM_BLOCK_GAS_LIMIT, MAXIMUM_EXTRA_DATA_SIZE, SLOT_DURATION,
};
use eyre::{ensure, WrapErr};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// The default number of payloads kept in the payload cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Configuration for the ember node.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Payload building configuration.
    pub builder: BuilderConfig,
    /// Payload cache configuration.
    pub cache: CacheConfig,
    /// Garbage collection coordination.
    pub gc: GcConfig,
}

impl Config {
    /// Loads the configuration from `path`.
    ///
    /// A missing file is created with the default configuration.
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let config: Self = confy::load_path(path)
            .wrap_err_with(|| format!("Could not load config file {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        confy::store_path(path, self)
            .wrap_err_with(|| format!("Could not save config file {path:?}"))
    }

    /// Rejects values the engine can not run with.
    pub fn validate(&self) -> eyre::Result<()> {
        ensure!(self.builder.max_payload_tasks > 0, "builder.max_payload_tasks must be positive");
        ensure!(
            self.builder.extra_data.len() <= MAXIMUM_EXTRA_DATA_SIZE,
            "builder.extra_data exceeds {MAXIMUM_EXTRA_DATA_SIZE} bytes"
        );
        ensure!(!self.builder.interval.is_zero(), "builder.interval must be positive");
        ensure!(self.cache.capacity > 0, "cache.capacity must be positive");
        ensure!(!self.cache.sweep_interval.is_zero(), "cache.sweep_interval must be positive");
        Ok(())
    }
}

/// Payload building configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// The interval at which a job starts a new improvement round.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// How long a job keeps improving its payload.
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
    /// Time budget of the first build of a job.
    #[serde(with = "humantime_serde")]
    pub first_build_deadline: Duration,
    /// Maximum number of improvement rounds in flight at once.
    pub max_payload_tasks: usize,
    /// The extra data written into built blocks.
    pub extra_data: String,
    /// The gas limit built blocks move towards.
    pub desired_gas_limit: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            deadline: SLOT_DURATION,
            first_build_deadline: Duration::from_millis(500),
            max_payload_tasks: 3,
            extra_data: EMBER_CLIENT_VERSION.to_string(),
            desired_gas_limit: ETHEREUM_BLOCK_GAS_LIMIT,
        }
    }
}

/// Payload cache configuration.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached payloads.
    pub capacity: usize,
    /// How long a payload stays retrievable.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// How often expired payloads are swept.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl: SLOT_DURATION * 5,
            sweep_interval: SLOT_DURATION,
        }
    }
}

/// Garbage collection coordination.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct GcConfig {
    /// Whether reclamation is deferred during first builds.
    pub mode: GcMode,
    /// Upper bound of a single suppression window.
    #[serde(with = "humantime_serde")]
    pub max_window: Duration,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self { mode: GcMode::Suppressing, max_window: Duration::from_secs(1) }
    }
}

/// How reclamation is coordinated with first builds.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GcMode {
    /// Defer reclamation while a first build runs.
    #[default]
    Suppressing,
    /// Never defer reclamation.
    NoOp,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENSION: &str = "toml";

    fn with_tempdir(filename: &str, proc: fn(&std::path::Path)) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join(filename).with_extension(EXTENSION);

        proc(&config_path);

        temp_dir.close().unwrap()
    }

    #[test]
    fn test_store_config() {
        with_tempdir("config-store-test", |config_path| {
            let config = Config::default();
            config.save(config_path).unwrap();
        })
    }

    #[test]
    fn test_load_config() {
        with_tempdir("config-load-test", |config_path| {
            let config = Config::default();
            config.save(config_path).unwrap();

            let loaded_config = Config::load(config_path).unwrap();
            assert_eq!(config, loaded_config);
        })
    }

    #[test]
    fn test_load_missing_creates_default() {
        with_tempdir("config-missing-test", |config_path| {
            let loaded_config = Config::load(config_path).unwrap();
            assert_eq!(loaded_config, Config::default());
            assert!(config_path.exists());
        })
    }

    #[test]
    fn parse_partial_config() {
        let s = r#"
[builder]
interval = "250ms"
extra_data = "hello"

[cache]
capacity = 4

[gc]
mode = "noop"
"#;
        let config: Config = toml::from_str(s).unwrap();
        assert_eq!(config.builder.interval, Duration::from_millis(250));
        assert_eq!(config.builder.extra_data, "hello");
        assert_eq!(config.builder.deadline, SLOT_DURATION);
        assert_eq!(config.cache.capacity, 4);
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.gc.mode, GcMode::NoOp);
        assert_eq!(config.gc.max_window, Duration::from_secs(1));
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn gc_mode_names() {
        let config: GcConfig = toml::from_str("mode = \"suppressing\"\nmax_window = \"2s\"").unwrap();
        assert_eq!(config.mode, GcMode::Suppressing);
        assert_eq!(config.max_window, Duration::from_secs(2));
        assert!(toml::from_str::<GcConfig>("mode = \"sometimes\"").is_err());
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.builder.extra_data = "x".repeat(MAXIMUM_EXTRA_DATA_SIZE + 1);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.builder.max_payload_tasks = 0;
        assert!(config.validate().is_err());
    }
}

//! Configuration file management.

use std::path::PathBuf;

use powseal_pow::difficulty::AdjustmentConfig;
use powseal_pow::SealerConfig;
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Sealing engine settings.
    #[serde(default)]
    pub sealer: SealerConfig,
    /// Synthetic work settings.
    #[serde(default)]
    pub work: WorkConfig,
    /// Difficulty adjustment parameters.
    #[serde(default)]
    pub adjustment: AdjustmentConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Synthetic work configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkConfig {
    /// Difficulty of the first block.
    #[serde(default = "default_difficulty")]
    pub difficulty: u64,
    /// Seal as a broadcast node (no real work).
    #[serde(default)]
    pub broadcast_node: bool,
    /// Pause between sealed blocks, in seconds.
    #[serde(default = "default_block_interval")]
    pub block_interval_secs: u64,
    /// Difficulty tiers sealed blocks are classified against. Empty = none.
    #[serde(default)]
    pub tiers: Vec<u64>,
    /// Stop after this many blocks. 0 = run until interrupted.
    #[serde(default)]
    pub max_blocks: u64,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

// Default value functions

fn default_difficulty() -> u64 {
    131_072
}

fn default_block_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            broadcast_node: false,
            block_interval_secs: default_block_interval(),
            tiers: Vec::new(),
            max_blocks: 0,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Data directory: `$POWSEAL_DATA_DIR`, or a platform default.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("POWSEAL_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Powseal")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Powseal")
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            dirs_fallback(".powseal")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/powseal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.sealer.threads, 0);
        assert_eq!(config.work.difficulty, 131_072);
        assert!(!config.work.broadcast_node);
        assert!(config.work.tiers.is_empty());
        assert_eq!(config.adjustment.bound_divisor, 2048);
        assert_eq!(config.advanced.log_level, "info");
    }

    #[test]
    fn test_parse_sections() {
        let text = r#"
            [sealer]
            threads = 2
            epoch_length = 500

            [work]
            difficulty = 1000
            broadcast_node = true
            tiers = [4000, 2000, 1000]

            [advanced]
            log_level = "debug"
        "#;
        let config: DaemonConfig = toml::from_str(text).expect("parse config");
        assert_eq!(config.sealer.threads, 2);
        assert_eq!(config.sealer.epoch_length, 500);
        assert_eq!(config.sealer.cached_epochs, 3);
        assert_eq!(config.work.difficulty, 1000);
        assert!(config.work.broadcast_node);
        assert_eq!(config.work.tiers, vec![4000, 2000, 1000]);
        assert_eq!(config.work.block_interval_secs, 5);
        assert_eq!(config.advanced.log_level, "debug");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("powseal-missing-config-test.toml");
        let config = DaemonConfig::load_from(&path).expect("load");
        assert_eq!(config.work.difficulty, 131_072);
    }

    #[test]
    fn test_roundtrip() {
        let mut config = DaemonConfig::default();
        config.work.max_blocks = 7;
        let text = toml::to_string(&config).expect("serialize");
        let back: DaemonConfig = toml::from_str(&text).expect("parse");
        assert_eq!(back.work.max_blocks, 7);
        assert_eq!(back.sealer, config.sealer);
    }
}

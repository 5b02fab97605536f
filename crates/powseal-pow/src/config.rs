//! Engine configuration.

use std::num::NonZeroUsize;

use powseal_types::DEFAULT_EPOCH_LENGTH;
use serde::{Deserialize, Serialize};

/// Sealing engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealerConfig {
    /// Worker threads per seal. 0 = host available parallelism.
    #[serde(default)]
    pub threads: usize,
    /// Blocks per dataset epoch.
    #[serde(default = "default_epoch_length")]
    pub epoch_length: u64,
    /// Bytes per generated dataset.
    #[serde(default = "default_dataset_size")]
    pub dataset_size: usize,
    /// Datasets kept in memory.
    #[serde(default = "default_cached_epochs")]
    pub cached_epochs: usize,
}

// Default value functions

fn default_epoch_length() -> u64 {
    DEFAULT_EPOCH_LENGTH
}

fn default_dataset_size() -> usize {
    1 << 20
}

fn default_cached_epochs() -> usize {
    3
}

impl Default for SealerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            epoch_length: default_epoch_length(),
            dataset_size: default_dataset_size(),
            cached_epochs: default_cached_epochs(),
        }
    }
}

/// Resolve a configured thread count to an actual worker count.
///
/// 0 asks the host; if the host cannot say, one worker is used.
pub fn resolve_threads(threads: usize) -> usize {
    if threads > 0 {
        return threads;
    }
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

//! Difficulty adjustment.
//!
//! A [`DifficultyCalculator`] derives the difficulty of the next block from
//! its parent header and its own timestamp. [`BoundedAdjustment`] moves the
//! parent difficulty by at most one `bound_divisor` fraction upward per
//! block, and by a capped number of fractions downward:
//!
//! ```text
//! step = max(1 - (time - parent.time) / duration_limit, -max_downward_steps)
//! diff = max(parent.difficulty + parent.difficulty / bound_divisor * step, minimum_difficulty)
//! ```

use powseal_types::{Header, U256};
use serde::{Deserialize, Serialize};

use crate::{PowError, Result};

/// Computes the difficulty a new block must meet.
///
/// Implementations are deterministic and pure.
pub trait DifficultyCalculator: Send + Sync {
    /// Difficulty for a block at `time` extending `parent`.
    ///
    /// # Errors
    ///
    /// - [`PowError::TimestampBeforeParent`] if `time` precedes the parent
    fn calc_difficulty(&self, time: u64, parent: &Header) -> Result<U256>;
}

/// Parameters of [`BoundedAdjustment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    /// Parent difficulty is divided by this to get one adjustment step.
    #[serde(default = "default_bound_divisor")]
    pub bound_divisor: u64,
    /// Seconds per block before difficulty starts to fall.
    #[serde(default = "default_duration_limit")]
    pub duration_limit: u64,
    /// Most steps difficulty may fall in one block.
    #[serde(default = "default_max_downward_steps")]
    pub max_downward_steps: u64,
    /// Difficulty never drops below this.
    #[serde(default = "default_minimum_difficulty")]
    pub minimum_difficulty: u64,
}

fn default_bound_divisor() -> u64 {
    2048
}

fn default_duration_limit() -> u64 {
    10
}

fn default_max_downward_steps() -> u64 {
    99
}

fn default_minimum_difficulty() -> u64 {
    131_072
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            bound_divisor: default_bound_divisor(),
            duration_limit: default_duration_limit(),
            max_downward_steps: default_max_downward_steps(),
            minimum_difficulty: default_minimum_difficulty(),
        }
    }
}

/// Parent-relative difficulty adjustment with bounded steps.
#[derive(Debug, Clone, Default)]
pub struct BoundedAdjustment {
    config: AdjustmentConfig,
}

impl BoundedAdjustment {
    /// Create a calculator with the given parameters.
    pub fn new(config: AdjustmentConfig) -> Self {
        Self { config }
    }

    /// Active parameters.
    pub fn config(&self) -> &AdjustmentConfig {
        &self.config
    }
}

impl DifficultyCalculator for BoundedAdjustment {
    fn calc_difficulty(&self, time: u64, parent: &Header) -> Result<U256> {
        if time < parent.time {
            return Err(PowError::TimestampBeforeParent {
                parent: parent.time,
                current: time,
            });
        }
        let cfg = &self.config;
        let periods = (time - parent.time) / cfg.duration_limit.max(1);
        let step = parent.difficulty / U256::from(cfg.bound_divisor.max(1));

        let diff = if periods == 0 {
            parent.difficulty.saturating_add(step)
        } else {
            let down = (periods - 1).min(cfg.max_downward_steps);
            parent.difficulty.saturating_sub(step.saturating_mul(U256::from(down)))
        };
        Ok(diff.max(U256::from(cfg.minimum_difficulty)))
    }
}

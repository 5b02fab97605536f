//! Synthetic chain driver.
//!
//! Builds a linear chain of headers, sealing each one in turn. Difficulty
//! after the first block follows the configured adjustment rule.

use std::sync::Arc;
use std::time::Duration;

use powseal_pow::dataset::DatasetProvider;
use powseal_pow::difficulty::{BoundedAdjustment, DifficultyCalculator};
use powseal_pow::hasher::PowHasher;
use powseal_pow::target::{build_layered_targets, SharedTargets};
use powseal_pow::{Sealer, StopSignal};
use powseal_types::{Header, H256, U256};
use tracing::{info, warn};

use crate::config::WorkConfig;
use crate::events::{unix_now, EventBus, EventKind};

/// Drives sealing over a synthetic chain.
pub struct ChainRunner<H, P> {
    sealer: Arc<Sealer<H, P>>,
    calculator: BoundedAdjustment,
    tiers: SharedTargets,
    work: WorkConfig,
    bus: EventBus,
}

impl<H: PowHasher, P: DatasetProvider> ChainRunner<H, P> {
    /// Create a runner.
    ///
    /// # Errors
    ///
    /// Fails if the configured tiers contain a zero difficulty.
    pub fn new(
        sealer: Arc<Sealer<H, P>>,
        calculator: BoundedAdjustment,
        work: WorkConfig,
        bus: EventBus,
    ) -> anyhow::Result<Self> {
        let difficulties: Vec<U256> = work.tiers.iter().copied().map(U256::from).collect();
        let tiers = SharedTargets::new(build_layered_targets(&difficulties)?);
        Ok(Self {
            sealer,
            calculator,
            tiers,
            work,
            bus,
        })
    }

    /// Header of the block after `parent`, or of the first block.
    fn next_header(&self, parent: Option<&Header>) -> anyhow::Result<Header> {
        let now = unix_now();
        let Some(parent) = parent else {
            return Ok(Header::new(H256::zero(), 1, U256::from(self.work.difficulty), now));
        };
        let time = now.max(parent.time);
        let difficulty = self.calculator.calc_difficulty(time, parent)?;
        Ok(Header::new(parent.hash(), parent.number + 1, difficulty, time))
    }

    /// Seal blocks until `stop` fires or `max_blocks` are sealed.
    ///
    /// Returns the number of blocks sealed.
    pub async fn run(&self, stop: &StopSignal) -> anyhow::Result<u64> {
        let interval = Duration::from_secs(self.work.block_interval_secs);
        let mut parent: Option<Header> = None;
        let mut sealed_count = 0u64;

        loop {
            let header = self.next_header(parent.as_ref())?;
            let Some(sealed) = self.sealer.seal(&header, stop, self.work.broadcast_node).await? else {
                self.bus.emit(EventKind::SealStopped { number: header.number });
                return Ok(sealed_count);
            };

            if !self.work.broadcast_node {
                self.sealer.verify_seal(&sealed)?;
            }
            let tiers = self.tiers.snapshot();
            let tier = if tiers.is_empty() {
                None
            } else {
                self.sealer.seal_tier(&sealed, &tiers)?
            };

            info!(
                number = sealed.number,
                nonce = sealed.nonce,
                hash = %sealed.hash(),
                tier = ?tier,
                hashrate = self.sealer.hashrate(),
                "Block sealed"
            );
            self.bus.emit(EventKind::BlockSealed {
                number: sealed.number,
                nonce: sealed.nonce,
                hash: sealed.hash(),
                difficulty: sealed.difficulty,
                tier,
            });

            sealed_count += 1;
            if self.work.max_blocks > 0 && sealed_count >= self.work.max_blocks {
                return Ok(sealed_count);
            }
            parent = Some(sealed);

            tokio::select! {
                _ = stop.stopped() => {
                    if let Some(parent) = &parent {
                        self.bus.emit(EventKind::SealStopped { number: parent.number + 1 });
                    }
                    return Ok(sealed_count);
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Replace the classification tiers. An empty list turns classification off.
    #[cfg_attr(not(unix), allow(dead_code))]
    pub fn set_tiers(&self, tiers: &[u64]) {
        let difficulties: Vec<U256> = tiers.iter().copied().map(U256::from).collect();
        if let Err(e) = self.tiers.replace(&difficulties) {
            warn!(error = %e, "Rejected tier update");
        }
    }
}

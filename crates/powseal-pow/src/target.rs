//! Difficulty to target conversion and layered tier matching.
//!
//! A target is the largest proof-of-work result accepted for a difficulty:
//!
//! ```text
//! target = MAX_256BIT / difficulty
//! ```
//!
//! A [`DifficultyTargetList`] holds several tiers ordered hardest first.
//! [`DifficultyTargetList::match_tier`] attributes a digest to the first tier it
//! satisfies, so a result that meets a harder tier is never reported against an
//! easier one.

use std::sync::{Arc, RwLock};

use powseal_types::{H256, MAX_256BIT, U256};

use crate::{PowError, Result};

/// Convert a difficulty into its 256-bit target.
///
/// # Errors
///
/// - [`PowError::ZeroDifficulty`] if `difficulty` is zero
pub fn to_target(difficulty: U256) -> Result<U256> {
    if difficulty.is_zero() {
        return Err(PowError::ZeroDifficulty);
    }
    Ok(MAX_256BIT / difficulty)
}

/// Interpret a digest as a big-endian 256-bit integer.
pub fn digest_value(digest: &H256) -> U256 {
    U256::from_big_endian(digest.as_bytes())
}

/// Whether `digest` is at or below `target`.
pub fn meets_target(digest: &H256, target: &U256) -> bool {
    digest_value(digest) <= *target
}

/// Parallel difficulty and target tiers, hardest difficulty first.
///
/// `targets[i] == MAX_256BIT / difficulties[i]`, so targets ascend as
/// difficulties descend. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyTargetList {
    difficulties: Vec<U256>,
    targets: Vec<U256>,
}

impl DifficultyTargetList {
    /// Build tiers from a caller-supplied difficulty list.
    ///
    /// The input is copied and sorted by descending difficulty.
    ///
    /// # Errors
    ///
    /// - [`PowError::ZeroDifficulty`] if any difficulty is zero
    pub fn new(difficulties: &[U256]) -> Result<Self> {
        let mut sorted = difficulties.to_vec();
        sorted.sort_by(|a, b| b.cmp(a));
        let targets = sorted
            .iter()
            .map(|d| to_target(*d))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            difficulties: sorted,
            targets,
        })
    }

    /// Return the index of the first tier whose target `digest` meets.
    ///
    /// Tiers are scanned hardest first; `None` means no tier is met.
    pub fn match_tier(&self, digest: &H256) -> Option<usize> {
        let value = digest_value(digest);
        self.targets.iter().position(|target| value <= *target)
    }

    /// Difficulties, hardest first.
    pub fn difficulties(&self) -> &[U256] {
        &self.difficulties
    }

    /// Targets, smallest first.
    pub fn targets(&self) -> &[U256] {
        &self.targets
    }

    /// Number of tiers.
    pub fn len(&self) -> usize {
        self.difficulties.len()
    }

    /// Whether the list has no tiers. An empty list matches nothing.
    pub fn is_empty(&self) -> bool {
        self.difficulties.is_empty()
    }
}

/// Build a [`DifficultyTargetList`] from a difficulty list.
///
/// # Errors
///
/// See [`DifficultyTargetList::new`].
pub fn build_layered_targets(difficulties: &[U256]) -> Result<DifficultyTargetList> {
    DifficultyTargetList::new(difficulties)
}

/// Tier list that can be rebuilt at runtime while readers classify digests.
///
/// Readers take a cheap snapshot; [`SharedTargets::replace`] swaps in a newly
/// built list without disturbing snapshots already handed out.
#[derive(Debug)]
pub struct SharedTargets {
    inner: RwLock<Arc<DifficultyTargetList>>,
}

impl SharedTargets {
    /// Wrap an already built list.
    pub fn new(list: DifficultyTargetList) -> Self {
        Self {
            inner: RwLock::new(Arc::new(list)),
        }
    }

    /// Rebuild the tiers from a new difficulty list.
    ///
    /// On error the current tiers are kept.
    ///
    /// # Errors
    ///
    /// See [`DifficultyTargetList::new`].
    pub fn replace(&self, difficulties: &[U256]) -> Result<()> {
        let list = Arc::new(DifficultyTargetList::new(difficulties)?);
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = list;
        Ok(())
    }

    /// Current tier list.
    pub fn snapshot(&self) -> Arc<DifficultyTargetList> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Classify a digest against the current tiers.
    pub fn match_tier(&self, digest: &H256) -> Option<usize> {
        self.snapshot().match_tier(digest)
    }
}

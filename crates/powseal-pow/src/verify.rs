//! Seal verification.
//!
//! Recomputes the hash of a sealed header and checks it against the header's
//! own difficulty, or classifies it against a layered tier list.

use powseal_types::Header;

use crate::dataset::{epoch_of, DatasetProvider};
use crate::hasher::{PowHasher, PowOutput};
use crate::target::{meets_target, to_target, DifficultyTargetList};
use crate::{PowError, Result};

fn recompute<H, P>(hasher: &H, datasets: &P, epoch_length: u64, header: &Header) -> Result<PowOutput>
where
    H: PowHasher + ?Sized,
    P: DatasetProvider + ?Sized,
{
    let dataset = datasets.dataset(epoch_of(header.number, epoch_length));
    let output = hasher.hash(&dataset, &header.hash_no_nonce(), header.nonce);
    if output.mix_digest != header.mix_digest {
        return Err(PowError::InvalidMixDigest);
    }
    Ok(output)
}

/// Check that a sealed header satisfies its own difficulty.
///
/// # Errors
///
/// - [`PowError::InvalidDifficulty`] if the header difficulty is zero
/// - [`PowError::InvalidMixDigest`] if the stored mix digest is wrong
/// - [`PowError::InvalidPoW`] if the result is above the target
pub fn verify_seal<H, P>(hasher: &H, datasets: &P, epoch_length: u64, header: &Header) -> Result<PowOutput>
where
    H: PowHasher + ?Sized,
    P: DatasetProvider + ?Sized,
{
    let target = to_target(header.difficulty).map_err(|_| PowError::InvalidDifficulty)?;
    let output = recompute(hasher, datasets, epoch_length, header)?;
    if !meets_target(&output.result, &target) {
        return Err(PowError::InvalidPoW);
    }
    Ok(output)
}

/// Attribute a sealed header to the hardest tier its result meets.
///
/// The header's own difficulty is not consulted.
///
/// # Errors
///
/// - [`PowError::InvalidMixDigest`] if the stored mix digest is wrong
pub fn seal_tier<H, P>(
    hasher: &H,
    datasets: &P,
    epoch_length: u64,
    header: &Header,
    tiers: &DifficultyTargetList,
) -> Result<Option<usize>>
where
    H: PowHasher + ?Sized,
    P: DatasetProvider + ?Sized,
{
    let output = recompute(hasher, datasets, epoch_length, header)?;
    Ok(tiers.match_tier(&output.result))
}

//! The mix/hash function.
//!
//! Sealing treats the hash as a pure function of the epoch dataset, the seal
//! hash of the header and the nonce. [`Blake3Hasher`] is a reference
//! implementation: it mixes a fixed number of pseudo-randomly selected
//! dataset pages into a running digest.

use powseal_crypto::blake3::{self, contexts};
use powseal_types::H256;

use crate::dataset::Dataset;

/// Bytes read from the dataset per lookup.
pub const PAGE_BYTES: usize = 64;

/// Default number of dataset lookups per hash.
pub const DEFAULT_ACCESSES: usize = 32;

/// Output of one hash evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowOutput {
    /// Intermediate mix digest, stored in the sealed header.
    pub mix_digest: H256,
    /// Final result compared against the target.
    pub result: H256,
}

/// Proof-of-work hash function.
///
/// Implementations must be pure: the same inputs always give the same output.
pub trait PowHasher: Send + Sync + 'static {
    /// Evaluate the hash for one nonce.
    fn hash(&self, dataset: &Dataset, header_hash: &H256, nonce: u64) -> PowOutput;
}

/// Reference hash function built on BLAKE3.
#[derive(Debug, Clone)]
pub struct Blake3Hasher {
    accesses: usize,
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self {
            accesses: DEFAULT_ACCESSES,
        }
    }
}

impl Blake3Hasher {
    /// Hasher performing `accesses` dataset lookups per evaluation.
    pub fn new(accesses: usize) -> Self {
        Self { accesses }
    }
}

impl PowHasher for Blake3Hasher {
    fn hash(&self, dataset: &Dataset, header_hash: &H256, nonce: u64) -> PowOutput {
        let mut input = [0u8; 40];
        input[..32].copy_from_slice(header_hash.as_bytes());
        input[32..].copy_from_slice(&nonce.to_le_bytes());
        let seed = blake3::derive_key(contexts::MIX_SEED, &input);

        let round_key = blake3::derive_key(contexts::MIX_ROUND, &seed);
        let pages = dataset.len() / PAGE_BYTES;
        let bytes = dataset.as_bytes();

        let mut mix = seed;
        if pages > 0 {
            let mut buf = [0u8; 32 + 4 + PAGE_BYTES];
            for round in 0..self.accesses {
                let mut index_bytes = [0u8; 8];
                index_bytes.copy_from_slice(&mix[..8]);
                let index = (u64::from_le_bytes(index_bytes) % pages as u64) as usize;
                let page = &bytes[index * PAGE_BYTES..(index + 1) * PAGE_BYTES];

                buf[..32].copy_from_slice(&mix);
                buf[32..36].copy_from_slice(&(round as u32).to_le_bytes());
                buf[36..].copy_from_slice(page);
                mix = blake3::keyed_hash(&round_key, &buf);
            }
        }

        let mut tail = [0u8; 64];
        tail[..32].copy_from_slice(&seed);
        tail[32..].copy_from_slice(&mix);
        let result = blake3::derive_key(contexts::MIX_RESULT, &tail);

        PowOutput {
            mix_digest: H256::from(mix),
            result: H256::from(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetGenerator, SeededGenerator};

    #[test]
    fn test_hash_is_pure() {
        let dataset = SeededGenerator::new(4096).generate(0);
        let hasher = Blake3Hasher::default();
        let header_hash = H256::repeat_byte(0x42);
        assert_eq!(
            hasher.hash(&dataset, &header_hash, 7),
            hasher.hash(&dataset, &header_hash, 7)
        );
    }

    #[test]
    fn test_hash_depends_on_inputs() {
        let dataset = SeededGenerator::new(4096).generate(0);
        let other = SeededGenerator::new(4096).generate(1);
        let hasher = Blake3Hasher::default();
        let header_hash = H256::repeat_byte(0x42);
        let base = hasher.hash(&dataset, &header_hash, 7);
        assert_ne!(base, hasher.hash(&dataset, &header_hash, 8));
        assert_ne!(base, hasher.hash(&dataset, &H256::repeat_byte(0x43), 7));
        assert_ne!(base, hasher.hash(&other, &header_hash, 7));
    }

    #[test]
    fn test_empty_dataset_is_supported() {
        let dataset = Dataset::new(0, Vec::new());
        let hasher = Blake3Hasher::default();
        let out = hasher.hash(&dataset, &H256::zero(), 0);
        assert_ne!(out.result, H256::zero());
    }

    #[test]
    fn test_short_dataset_tail_ignored() {
        // 100 bytes is one full page plus a partial one that is never read.
        let dataset = Dataset::new(0, vec![9u8; 100]);
        let hasher = Blake3Hasher::new(4);
        let out = hasher.hash(&dataset, &H256::zero(), 1);
        assert_eq!(out, hasher.hash(&dataset, &H256::zero(), 1));
    }
}

//! Block header as seen by the sealing engine.
//!
//! A header is "sealed" once `nonce` and `mix_digest` hold a proof-of-work
//! solution for its difficulty. The seal hash ([`Header::hash_no_nonce`])
//! covers every field except those two, so it stays fixed while workers vary
//! the nonce.

use crate::NONCE_LEN;
use powseal_crypto::blake3::{self, contexts};
use primitive_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};

/// Candidate or sealed block header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: H256,
    /// Beneficiary of the block reward.
    pub coinbase: H160,
    /// Block height.
    pub number: u64,
    /// Proof-of-work difficulty. Zero is never sealable.
    pub difficulty: U256,
    /// Unix timestamp in seconds.
    pub time: u64,
    /// Free-form extra data.
    #[serde(default)]
    pub extra: Vec<u8>,
    /// Proof-of-work nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Mix digest produced alongside the proof-of-work result.
    #[serde(default)]
    pub mix_digest: H256,
}

impl Header {
    /// Create an unsealed header.
    pub fn new(parent_hash: H256, number: u64, difficulty: U256, time: u64) -> Self {
        Self {
            parent_hash,
            number,
            difficulty,
            time,
            ..Default::default()
        }
    }

    /// Canonical encoding of every field except `nonce` and `mix_digest`.
    ///
    /// `parent_hash || coinbase || LE64(number) || BE256(difficulty) ||
    /// LE64(time) || LE32(len(extra)) || extra`
    pub fn encode_no_nonce(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 20 + 8 + 32 + 8 + 4 + self.extra.len());
        out.extend_from_slice(self.parent_hash.as_bytes());
        out.extend_from_slice(self.coinbase.as_bytes());
        out.extend_from_slice(&self.number.to_le_bytes());
        let mut difficulty = [0u8; 32];
        self.difficulty.to_big_endian(&mut difficulty);
        out.extend_from_slice(&difficulty);
        out.extend_from_slice(&self.time.to_le_bytes());
        out.extend_from_slice(&(self.extra.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.extra);
        out
    }

    /// Seal hash: the header hash without nonce and mix digest.
    pub fn hash_no_nonce(&self) -> H256 {
        H256::from(blake3::derive_key(
            contexts::HEADER_SEAL_HASH,
            &self.encode_no_nonce(),
        ))
    }

    /// Full header hash, including the seal fields.
    pub fn hash(&self) -> H256 {
        let mut data = Vec::with_capacity(32 + NONCE_LEN + 32);
        data.extend_from_slice(self.hash_no_nonce().as_bytes());
        data.extend_from_slice(&self.nonce.to_le_bytes());
        data.extend_from_slice(self.mix_digest.as_bytes());
        H256::from(blake3::derive_key(contexts::HEADER_FULL_HASH, &data))
    }

    /// Return a copy of this header carrying the given seal.
    pub fn with_seal(&self, nonce: u64, mix_digest: H256) -> Self {
        let mut sealed = self.clone();
        sealed.nonce = nonce;
        sealed.mix_digest = mix_digest;
        sealed
    }

    /// Short hex form of the seal hash for log lines.
    pub fn terminal_string(&self) -> String {
        let hash = self.hash_no_nonce();
        let bytes = hash.as_bytes();
        format!(
            "{:02x}{:02x}{:02x}…{:02x}{:02x}{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[29], bytes[30], bytes[31]
        )
    }
}

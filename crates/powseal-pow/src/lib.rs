//! # powseal-pow
//!
//! Proof-of-work sealing engine.
//!
//! A [`Sealer`](sealer::Sealer) turns a candidate header into a sealed one by
//! running a set of nonce-search workers against a shared per-epoch dataset.
//! The first worker to find a result under the target wins; the rest are
//! cancelled and joined before the call returns.
//!
//! ## Modules
//!
//! - [`target`]: Difficulty to target conversion and layered tier matching
//! - [`dataset`]: Epoch-keyed dataset provider and in-memory cache
//! - [`hasher`]: The mix/hash function contract and a reference implementation
//! - [`meter`]: Hashrate meter (exponentially weighted moving rates)
//! - [`session`]: Stop signal and per-seal session state
//! - [`worker`]: Nonce search loop
//! - [`sealer`]: Seal orchestrator
//! - [`difficulty`]: Difficulty adjustment contract
//! - [`verify`]: Seal verification
//! - [`config`]: Engine configuration

pub mod config;
pub mod dataset;
pub mod difficulty;
pub mod hasher;
pub mod meter;
pub mod sealer;
pub mod session;
pub mod target;
pub mod verify;
pub mod worker;

pub use config::SealerConfig;
pub use sealer::Sealer;
pub use session::{stop_channel, StopHandle, StopSignal};

/// Error types for proof-of-work operations.
#[derive(Debug, thiserror::Error)]
pub enum PowError {
    /// A difficulty of zero has no target.
    #[error("difficulty must be non-zero")]
    ZeroDifficulty,

    /// The random seed source could not be initialized.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// Difficulty was requested for a block older than its parent.
    #[error("timestamp {current} precedes parent timestamp {parent}")]
    TimestampBeforeParent {
        /// Parent block timestamp.
        parent: u64,
        /// Requested block timestamp.
        current: u64,
    },

    /// The header carries a difficulty that cannot be verified.
    #[error("invalid difficulty")]
    InvalidDifficulty,

    /// The header's mix digest does not match the recomputed one.
    #[error("invalid mix digest")]
    InvalidMixDigest,

    /// The proof-of-work result is above the target.
    #[error("invalid proof-of-work")]
    InvalidPoW,
}

/// Convenience result type for proof-of-work operations.
pub type Result<T> = std::result::Result<T, PowError>;

//! # powseal-types
//!
//! Shared domain types used across the powseal workspace.

pub mod header;

pub use header::Header;
pub use primitive_types::{H160, H256, U256};

/// Largest 256-bit value. Dividing it by a difficulty yields the target.
pub const MAX_256BIT: U256 = U256::MAX;

/// Default number of blocks sharing one dataset.
pub const DEFAULT_EPOCH_LENGTH: u64 = 30_000;

/// Block nonce width in bytes.
pub const NONCE_LEN: usize = 8;

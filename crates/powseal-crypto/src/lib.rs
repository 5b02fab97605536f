//! # powseal-crypto
//!
//! Hashing primitives for the sealing engine.
//!
//! Every digest in the workspace is BLAKE3. Different uses are kept apart by
//! BLAKE3's key-derivation mode with a fixed registry of context strings.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated BLAKE3 hashing and the context registry

pub mod blake3;

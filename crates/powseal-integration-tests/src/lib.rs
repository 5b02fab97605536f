//! Integration test crate for the powseal sealing engine.
//!
//! This crate has no library code. It only contains integration tests that
//! exercise sealing end to end across the workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p powseal-integration-tests
//! ```

//! Nonce search worker.
//!
//! A worker walks nonces upward from its seed, hashing each against the
//! shared dataset, until it finds a result under the target or its session is
//! aborted. The abort flag is polled before every hash.
//!
//! Attempts are reported to the hashrate meter in batches of
//! [`REPORT_INTERVAL`], and once more on exit.

use std::sync::Arc;

use powseal_types::{Header, MAX_256BIT, U256};
use tracing::{debug, trace};

use crate::dataset::Dataset;
use crate::hasher::PowHasher;
use crate::meter::Meter;
use crate::session::SealSession;
use crate::target::{meets_target, to_target};
use crate::Result;

/// Attempts between hashrate reports.
pub const REPORT_INTERVAL: u64 = 1 << 15;

/// Target a worker searches against.
///
/// Broadcast nodes are exempt from real work: their target is `MAX_256BIT`,
/// which every result meets.
///
/// # Errors
///
/// - [`PowError::ZeroDifficulty`](crate::PowError::ZeroDifficulty) if the
///   header difficulty is zero and this is not a broadcast node
pub fn search_target(header: &Header, is_broadcast_node: bool) -> Result<U256> {
    if is_broadcast_node {
        return Ok(MAX_256BIT);
    }
    to_target(header.difficulty)
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A solution was found and accepted as the session result.
    Published { nonce: u64 },
    /// A solution was found after the session resolved and was dropped.
    Discarded { nonce: u64 },
    /// The session was aborted before a solution was found.
    Aborted { attempts: u64 },
}

/// One search unit of a seal session.
pub struct Worker<H> {
    id: usize,
    hasher: Arc<H>,
    dataset: Arc<Dataset>,
    meter: Arc<Meter>,
    session: Arc<SealSession>,
}

impl<H: PowHasher> Worker<H> {
    /// Create a worker bound to a session and its dataset.
    pub fn new(
        id: usize,
        hasher: Arc<H>,
        dataset: Arc<Dataset>,
        meter: Arc<Meter>,
        session: Arc<SealSession>,
    ) -> Self {
        Self {
            id,
            hasher,
            dataset,
            meter,
            session,
        }
    }

    /// Worker index within its session.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Search for a nonce starting at `seed`.
    ///
    /// # Errors
    ///
    /// See [`search_target`].
    pub fn search(&self, header: &Header, seed: u64, is_broadcast_node: bool) -> Result<SearchOutcome> {
        let target = search_target(header, is_broadcast_node)?;
        let header_hash = header.hash_no_nonce();

        debug!(
            worker = self.id,
            seed,
            number = header.number,
            broadcast = is_broadcast_node,
            "Started nonce search"
        );

        let mut nonce = seed;
        let mut pending = 0u64;
        loop {
            if self.session.is_aborted() {
                self.meter.mark(pending);
                let attempts = nonce.wrapping_sub(seed);
                trace!(worker = self.id, attempts, "Nonce search aborted");
                return Ok(SearchOutcome::Aborted { attempts });
            }

            pending += 1;
            if pending == REPORT_INTERVAL {
                self.meter.mark(pending);
                pending = 0;
            }

            let output = self.hasher.hash(&self.dataset, &header_hash, nonce);
            if meets_target(&output.result, &target) {
                self.meter.mark(pending);
                let sealed = header.with_seal(nonce, output.mix_digest);
                let attempts = nonce.wrapping_sub(seed) + 1;
                if self.session.publish(sealed) {
                    trace!(worker = self.id, attempts, nonce, "Nonce found and reported");
                    return Ok(SearchOutcome::Published { nonce });
                }
                trace!(worker = self.id, attempts, nonce, "Nonce found but discarded");
                return Ok(SearchOutcome::Discarded { nonce });
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

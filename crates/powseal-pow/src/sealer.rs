//! Seal orchestrator.
//!
//! [`Sealer::seal`] runs rounds. Each round snapshots the worker count, draws
//! one base seed, spawns the workers on blocking threads and waits for the
//! first of:
//!
//! - the caller's stop signal: the round ends with no result
//! - a published solution: the round ends with the sealed header
//! - a worker-count change: the round is torn down and a new one starts
//!   with the same header and stop signal
//!
//! Every round aborts its session and joins all of its workers before the
//! next step, so no worker outlives the call. A seal future dropped before
//! completion still aborts its workers; they exit at their next poll.

use std::sync::{Arc, Mutex};

use powseal_types::Header;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{resolve_threads, SealerConfig};
use crate::dataset::{epoch_of, DatasetCache, DatasetProvider, SeededGenerator};
use crate::hasher::{Blake3Hasher, PowHasher, PowOutput};
use crate::meter::Meter;
use crate::session::{SealSession, StopSignal};
use crate::target::DifficultyTargetList;
use crate::verify;
use crate::worker::{search_target, SearchOutcome, Worker};
use crate::{PowError, Result};

/// Source of the seed generator, consulted on the first seal only.
pub type EntropySource = fn() -> std::result::Result<StdRng, rand::Error>;

fn os_entropy() -> std::result::Result<StdRng, rand::Error> {
    StdRng::from_rng(OsRng)
}

/// Aborts a round's session when dropped, including when the seal future
/// itself is dropped mid-round.
struct AbortOnDrop(Arc<SealSession>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum RoundEnd {
    Stopped,
    Found(Header),
    Restart,
}

/// Proof-of-work sealing engine.
pub struct Sealer<H, P> {
    config: SealerConfig,
    hasher: Arc<H>,
    datasets: Arc<P>,
    meter: Arc<Meter>,
    rng: Mutex<Option<StdRng>>,
    entropy: EntropySource,
    threads: watch::Sender<usize>,
}

impl Sealer<Blake3Hasher, DatasetCache<SeededGenerator>> {
    /// Sealer using the reference hasher and a seeded dataset cache.
    pub fn from_config(config: SealerConfig) -> Self {
        let datasets = DatasetCache::new(SeededGenerator::new(config.dataset_size), config.cached_epochs);
        Self::new(config, Blake3Hasher::default(), datasets)
    }
}

impl<H: PowHasher, P: DatasetProvider> Sealer<H, P> {
    /// Create a sealer.
    pub fn new(config: SealerConfig, hasher: H, datasets: P) -> Self {
        let (threads, _) = watch::channel(config.threads);
        Self {
            config,
            hasher: Arc::new(hasher),
            datasets: Arc::new(datasets),
            meter: Arc::new(Meter::new()),
            rng: Mutex::new(None),
            entropy: os_entropy,
            threads,
        }
    }

    /// Replace the seed generator source.
    pub fn with_entropy(mut self, entropy: EntropySource) -> Self {
        self.entropy = entropy;
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &SealerConfig {
        &self.config
    }

    /// Change the worker count. 0 = host available parallelism.
    ///
    /// A seal in progress restarts with the new count; setting the current
    /// value again is a no-op.
    pub fn set_threads(&self, threads: usize) {
        self.threads.send_if_modified(|current| {
            if *current == threads {
                return false;
            }
            *current = threads;
            true
        });
    }

    /// Configured worker count. 0 = host available parallelism.
    pub fn threads(&self) -> usize {
        *self.threads.borrow()
    }

    /// One-minute hashrate, in hashes per second.
    pub fn hashrate(&self) -> f64 {
        self.meter.rate1()
    }

    /// Hashrate meter shared by all workers.
    pub fn meter(&self) -> &Arc<Meter> {
        &self.meter
    }

    /// Search for a nonce sealing `header`.
    ///
    /// Returns `Ok(None)` once `stop` is signalled, including when it was
    /// signalled before the call. Broadcast nodes run one worker and accept
    /// the first nonce tried.
    ///
    /// # Errors
    ///
    /// - [`PowError::Entropy`] if the seed generator cannot be created; no
    ///   workers are spawned
    /// - [`PowError::ZeroDifficulty`] if the header has zero difficulty and
    ///   this is not a broadcast node
    pub async fn seal(&self, header: &Header, stop: &StopSignal, is_broadcast_node: bool) -> Result<Option<Header>> {
        let header = header.clone();
        search_target(&header, is_broadcast_node)?;

        let mut threads_rx = self.threads.subscribe();
        let mut pinned = None;

        info!(
            number = header.number,
            hash = %header.terminal_string(),
            broadcast = is_broadcast_node,
            "Sealing started"
        );
        loop {
            let threads = if is_broadcast_node {
                1
            } else {
                resolve_threads(*threads_rx.borrow_and_update())
            };
            let base_seed = self.next_seed()?;

            if stop.is_stopped() {
                info!(number = header.number, hash = %header.terminal_string(), "Sealing stopped");
                return Ok(None);
            }

            let dataset = pinned
                .get_or_insert_with(|| self.datasets.dataset(epoch_of(header.number, self.config.epoch_length)))
                .clone();
            let session = Arc::new(SealSession::new());
            let _abort = AbortOnDrop(session.clone());
            let spacing = u64::MAX / threads as u64;

            let mut workers = JoinSet::new();
            for id in 0..threads {
                let worker = Worker::new(
                    id,
                    self.hasher.clone(),
                    dataset.clone(),
                    self.meter.clone(),
                    session.clone(),
                );
                let header = header.clone();
                let seed = base_seed.wrapping_add(spacing.wrapping_mul(id as u64));
                workers.spawn_blocking(move || worker.search(&header, seed, is_broadcast_node));
            }
            debug!(number = header.number, threads, base_seed, "Spawned workers");

            // Stop takes priority: a result published in the same instant is
            // dropped and the call returns `None`.
            let end = tokio::select! {
                biased;
                _ = stop.stopped() => RoundEnd::Stopped,
                found = session.found() => RoundEnd::Found(found),
                Ok(()) = threads_rx.changed() => RoundEnd::Restart,
            };

            session.abort();
            join_workers(&mut workers).await;

            match end {
                RoundEnd::Stopped => {
                    info!(number = header.number, hash = %header.terminal_string(), "Sealing stopped");
                    return Ok(None);
                }
                RoundEnd::Found(sealed) => {
                    info!(number = sealed.number, nonce = sealed.nonce, "Sealing found nonce");
                    return Ok(Some(sealed));
                }
                RoundEnd::Restart => {
                    if let Some(sealed) = session.result() {
                        info!(number = sealed.number, nonce = sealed.nonce, "Sealing found nonce");
                        return Ok(Some(sealed.clone()));
                    }
                    info!(
                        number = header.number,
                        old_threads = threads,
                        new_threads = self.threads(),
                        "Worker count changed, restarting sealing"
                    );
                }
            }
        }
    }

    /// Check that `header` carries a valid seal for its own difficulty.
    ///
    /// # Errors
    ///
    /// See [`verify::verify_seal`].
    pub fn verify_seal(&self, header: &Header) -> Result<PowOutput> {
        verify::verify_seal(&*self.hasher, &*self.datasets, self.config.epoch_length, header)
    }

    /// Hardest tier of `tiers` the seal of `header` meets.
    ///
    /// # Errors
    ///
    /// See [`verify::seal_tier`].
    pub fn seal_tier(&self, header: &Header, tiers: &DifficultyTargetList) -> Result<Option<usize>> {
        verify::seal_tier(&*self.hasher, &*self.datasets, self.config.epoch_length, header, tiers)
    }

    /// Draw a base seed, creating the generator on first use.
    fn next_seed(&self) -> Result<u64> {
        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let mut rng = match guard.take() {
            Some(rng) => rng,
            None => (self.entropy)().map_err(|e| PowError::Entropy(e.to_string()))?,
        };
        let seed = rng.gen::<u64>();
        *guard = Some(rng);
        Ok(seed)
    }
}

async fn join_workers(workers: &mut JoinSet<Result<SearchOutcome>>) {
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Worker exited with error"),
            Err(e) => warn!(error = %e, "Worker task failed"),
        }
    }
}

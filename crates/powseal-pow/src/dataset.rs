//! Epoch-keyed dataset provider.
//!
//! The hash function reads from a large immutable table that changes once per
//! epoch. Handles are reference counted: a seal session clones one handle per
//! worker, so a dataset evicted from the cache stays readable until the last
//! worker of that session drops its clone.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use powseal_crypto::blake3::{self, contexts};
use tracing::{debug, info};

/// Immutable table for one epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    epoch: u64,
    bytes: Vec<u8>,
}

impl Dataset {
    /// Wrap raw dataset bytes for `epoch`.
    pub fn new(epoch: u64, bytes: Vec<u8>) -> Self {
        Self { epoch, bytes }
    }

    /// Epoch this dataset belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Raw table contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Table size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the table holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Epoch a block number falls into.
///
/// An `epoch_length` of zero is treated as one block per epoch.
pub fn epoch_of(number: u64, epoch_length: u64) -> u64 {
    number / epoch_length.max(1)
}

/// Supplies the dataset for an epoch.
pub trait DatasetProvider: Send + Sync + 'static {
    /// Return a shared handle to the dataset for `epoch`.
    fn dataset(&self, epoch: u64) -> Arc<Dataset>;
}

/// Produces the dataset contents for an epoch.
pub trait DatasetGenerator: Send + Sync + 'static {
    /// Build the dataset for `epoch`.
    fn generate(&self, epoch: u64) -> Dataset;
}

/// Reference generator: BLAKE3 extendable output over a per-epoch seed.
#[derive(Debug, Clone)]
pub struct SeededGenerator {
    size: usize,
}

impl SeededGenerator {
    /// Generator producing datasets of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Seed for `epoch`.
    pub fn seed(epoch: u64) -> [u8; 32] {
        blake3::derive_key(contexts::DATASET_SEED, &epoch.to_le_bytes())
    }
}

impl DatasetGenerator for SeededGenerator {
    fn generate(&self, epoch: u64) -> Dataset {
        let mut bytes = vec![0u8; self.size];
        blake3::hash_xof(&Self::seed(epoch), &mut bytes);
        Dataset::new(epoch, bytes)
    }
}

/// In-memory cache of the most recently used epoch datasets.
///
/// Holds at most `capacity` datasets; the least recently requested epoch is
/// evicted first.
pub struct DatasetCache<G> {
    generator: G,
    capacity: usize,
    entries: Mutex<VecDeque<Arc<Dataset>>>,
}

impl<G: DatasetGenerator> DatasetCache<G> {
    /// Create a cache keeping up to `capacity` datasets (at least one).
    pub fn new(generator: G, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            generator,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Epochs currently held, least recently used first.
    pub fn cached_epochs(&self) -> Vec<u64> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|d| d.epoch())
            .collect()
    }
}

impl<G: DatasetGenerator> DatasetProvider for DatasetCache<G> {
    fn dataset(&self, epoch: u64) -> Arc<Dataset> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(pos) = entries.iter().position(|d| d.epoch() == epoch) {
            if let Some(hit) = entries.remove(pos) {
                entries.push_back(hit.clone());
                return hit;
            }
        }

        info!(epoch, "Generating dataset");
        let dataset = Arc::new(self.generator.generate(epoch));
        entries.push_back(dataset.clone());
        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_front() {
                debug!(epoch = evicted.epoch(), "Evicted dataset from cache");
            }
        }
        dataset
    }
}

impl<P: DatasetProvider + ?Sized> DatasetProvider for Arc<P> {
    fn dataset(&self, epoch: u64) -> Arc<Dataset> {
        (**self).dataset(epoch)
    }
}

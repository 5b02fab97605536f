//! Event emission.
//!
//! Sealing outcomes are published on a broadcast bus. Each event carries a
//! bus-assigned sequence number; a subscriber that falls behind the buffer
//! skips the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use powseal_types::{H256, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// The daemon finished starting up.
    DaemonStarted {
        /// Crate version.
        version: String,
    },
    /// A block was sealed and verified.
    BlockSealed {
        /// Block number.
        number: u64,
        /// Winning nonce.
        nonce: u64,
        /// Full hash of the sealed header.
        hash: H256,
        /// Difficulty the block was sealed at.
        difficulty: U256,
        /// Hardest configured tier the seal meets.
        tier: Option<usize>,
    },
    /// Sealing stopped before a block was found.
    SealStopped {
        /// Number of the block being sealed.
        number: u64,
    },
}

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position on the bus, starting at 1.
    pub sequence: u64,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers. Returns its sequence number.
    pub fn emit(&self, kind: EventKind) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event = Event {
            sequence,
            timestamp: unix_now(),
            kind,
        };
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
        sequence
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

//! Hashrate meter.
//!
//! Workers report attempted hashes in batches with [`Meter::mark`]. The meter
//! keeps a running total and one, five and fifteen minute exponentially
//! weighted moving rates, updated once per [`TICK_INTERVAL`].
//!
//! Ticking is lazy: pending ticks are applied on the next mark or read.
//! `mark` only takes the rate lock when it is free, so a reader never stalls a
//! worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, TryLockError};
use std::time::{Duration, Instant};

/// Interval between EWMA updates.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn new(minutes: f64) -> Self {
        Self {
            alpha: 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / minutes).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    fn tick(&mut self, count: u64) {
        let instant = count as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            self.rate = instant;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct Rates {
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    last_tick: Instant,
}

/// Thread-safe event rate meter.
#[derive(Debug)]
pub struct Meter {
    count: AtomicU64,
    uncounted: AtomicU64,
    start: Instant,
    rates: Mutex<Rates>,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    /// Create a meter starting now.
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            count: AtomicU64::new(0),
            uncounted: AtomicU64::new(0),
            start,
            rates: Mutex::new(Rates {
                m1: Ewma::new(1.0),
                m5: Ewma::new(5.0),
                m15: Ewma::new(15.0),
                last_tick: start,
            }),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.count.fetch_add(n, Ordering::Relaxed);
        self.uncounted.fetch_add(n, Ordering::Relaxed);

        let mut rates = match self.rates.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        self.catch_up(&mut rates, Instant::now());
    }

    /// Total events recorded.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// One-minute moving rate, in events per second.
    pub fn rate1(&self) -> f64 {
        self.rates_at(Instant::now()).0
    }

    /// Five-minute moving rate, in events per second.
    pub fn rate5(&self) -> f64 {
        self.rates_at(Instant::now()).1
    }

    /// Fifteen-minute moving rate, in events per second.
    pub fn rate15(&self) -> f64 {
        self.rates_at(Instant::now()).2
    }

    /// Mean rate since the meter was created, in events per second.
    pub fn rate_mean(&self) -> f64 {
        let elapsed = self.start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.count() as f64 / elapsed
    }

    /// Apply pending ticks up to `now` and return (m1, m5, m15).
    fn rates_at(&self, now: Instant) -> (f64, f64, f64) {
        let mut rates = self.rates.lock().unwrap_or_else(|e| e.into_inner());
        self.catch_up(&mut rates, now);
        (rates.m1.rate, rates.m5.rate, rates.m15.rate)
    }

    fn catch_up(&self, rates: &mut Rates, now: Instant) {
        while now.saturating_duration_since(rates.last_tick) >= TICK_INTERVAL {
            let n = self.uncounted.swap(0, Ordering::Relaxed);
            rates.m1.tick(n);
            rates.m5.tick(n);
            rates.m15.tick(n);
            rates.last_tick += TICK_INTERVAL;
        }
    }
}

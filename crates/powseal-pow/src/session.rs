//! Stop signal and per-seal session state.
//!
//! A [`StopSignal`] is level-triggered: once [`StopHandle::stop`] is called,
//! every current and future observer sees it, including a seal that starts
//! afterwards.
//!
//! A [`SealSession`] lives for one sealing round. It owns the broadcast abort
//! flag polled by workers and a single-assignment result cell. Workers publish
//! without blocking; a result offered after the cell is filled or the session
//! is aborted is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use powseal_types::Header;
use tokio::sync::{watch, Notify};

/// Create a connected stop handle and signal.
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
}

/// Requests that sealing stop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Signal stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Whether stop has been signalled.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observes a stop request.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Whether stop has been signalled.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once stop is signalled.
    ///
    /// If every [`StopHandle`] is dropped without signalling, this never
    /// resolves.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Shared state of one sealing round.
#[derive(Debug, Default)]
pub struct SealSession {
    aborted: AtomicBool,
    result: OnceLock<Header>,
    found: Notify,
}

impl SealSession {
    /// Create an open session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast cancellation to every worker of the session.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    /// Whether the session has been cancelled.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Offer a sealed header as the session result.
    ///
    /// Returns `false` and drops the header if the session is already aborted
    /// or another worker published first.
    pub fn publish(&self, header: Header) -> bool {
        if self.is_aborted() {
            return false;
        }
        if self.result.set(header).is_err() {
            return false;
        }
        self.found.notify_one();
        true
    }

    /// The published result, if any.
    pub fn result(&self) -> Option<&Header> {
        self.result.get()
    }

    /// Wait until a result is published.
    pub async fn found(&self) -> Header {
        loop {
            if let Some(header) = self.result.get() {
                return header.clone();
            }
            self.found.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_stop_is_level_triggered() {
        let (handle, signal) = stop_channel();
        assert!(!signal.is_stopped());
        handle.stop();
        handle.stop();
        assert!(signal.is_stopped());
        assert!(signal.clone().is_stopped());
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_stopped_resolves_after_early_stop() {
        let (handle, signal) = stop_channel();
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), signal.stopped())
            .await
            .expect("already stopped signal must resolve");
    }

    #[tokio::test]
    async fn test_stopped_resolves_on_later_stop() {
        let (handle, signal) = stop_channel();
        let waiter = tokio::spawn(async move { signal.stopped().await });
        tokio::task::yield_now().await;
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("timeout")
            .expect("join");
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_does_not_resolve() {
        let signal = StopSignal::never();
        let outcome = tokio::time::timeout(Duration::from_secs(60), signal.stopped()).await;
        assert!(outcome.is_err());
    }

    #[test]
    fn test_publish_first_wins() {
        let session = SealSession::new();
        let first = Header {
            nonce: 1,
            ..Default::default()
        };
        let second = Header {
            nonce: 2,
            ..Default::default()
        };
        assert!(session.publish(first));
        assert!(!session.publish(second));
        assert_eq!(session.result().map(|h| h.nonce), Some(1));
    }

    #[test]
    fn test_publish_after_abort_discarded() {
        let session = SealSession::new();
        session.abort();
        assert!(session.is_aborted());
        assert!(!session.publish(Header::default()));
        assert!(session.result().is_none());
    }

    #[tokio::test]
    async fn test_found_sees_earlier_publish() {
        let session = SealSession::new();
        let header = Header {
            nonce: 9,
            ..Default::default()
        };
        session.publish(header);
        let found = tokio::time::timeout(Duration::from_secs(1), session.found())
            .await
            .expect("found");
        assert_eq!(found.nonce, 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_found_wakes_on_publish_from_thread() {
        let session = Arc::new(SealSession::new());
        let publisher = session.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let header = Header {
                nonce: 5,
                ..Default::default()
            };
            publisher.publish(header);
        });
        let found = tokio::time::timeout(Duration::from_secs(5), session.found())
            .await
            .expect("found");
        assert_eq!(found.nonce, 5);
    }
}

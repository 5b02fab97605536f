//! Integration test: seal, verify and cancel with the reference engine.
//!
//! Uses the real BLAKE3 hasher and seeded dataset cache, with difficulties
//! low enough that a seal completes in a handful of hashes.

use std::sync::Arc;
use std::time::Duration;

use powseal_pow::dataset::{epoch_of, DatasetCache, DatasetProvider, SeededGenerator};
use powseal_pow::hasher::{Blake3Hasher, PowHasher};
use powseal_pow::target::{meets_target, to_target};
use powseal_pow::{stop_channel, PowError, Sealer, SealerConfig, StopSignal};
use powseal_types::{Header, H256, U256};

/// Simulated timestamp for deterministic headers.
const TEST_TIMESTAMP: u64 = 1_700_000_000;

/// Upper bound on any single seal in these tests.
const WAIT: Duration = Duration::from_secs(30);

fn config(threads: usize) -> SealerConfig {
    SealerConfig {
        threads,
        epoch_length: 64,
        dataset_size: 16 * 1024,
        cached_epochs: 2,
    }
}

fn header(number: u64, difficulty: u64) -> Header {
    Header::new(H256::repeat_byte(0x11), number, U256::from(difficulty), TEST_TIMESTAMP)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn seal_then_verify_roundtrip() {
    let sealer = Sealer::from_config(config(2));
    let candidate = header(10, 16);

    let sealed = tokio::time::timeout(WAIT, sealer.seal(&candidate, &StopSignal::never(), false))
        .await
        .expect("seal timed out")
        .expect("seal")
        .expect("sealed header");

    // Only nonce and mix digest change.
    assert_eq!(sealed.hash_no_nonce(), candidate.hash_no_nonce());
    assert_eq!(sealed.number, candidate.number);

    let output = sealer.verify_seal(&sealed).expect("valid seal");
    assert_eq!(output.mix_digest, sealed.mix_digest);
    let target = to_target(U256::from(16u64)).expect("target");
    assert!(meets_target(&output.result, &target));
    assert!(sealer.meter().count() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tampered_seal_rejected() {
    let sealer = Sealer::from_config(config(1));
    let mut sealed = sealer
        .seal(&header(3, 8), &StopSignal::never(), false)
        .await
        .expect("seal")
        .expect("sealed header");

    sealed.nonce = sealed.nonce.wrapping_add(1);
    assert!(matches!(
        sealer.verify_seal(&sealed),
        Err(PowError::InvalidMixDigest) | Err(PowError::InvalidPoW)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_always_terminates() {
    // Effectively unreachable difficulty: only stop can end the seal.
    let sealer = Arc::new(Sealer::from_config(config(4)));
    let (handle, stop) = stop_channel();

    let task = {
        let sealer = sealer.clone();
        tokio::spawn(async move { sealer.seal(&header(1, u64::MAX), &stop, false).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.stop();

    let result = tokio::time::timeout(WAIT, task)
        .await
        .expect("seal timed out")
        .expect("join")
        .expect("seal");
    assert!(result.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_races_with_success() {
    // Difficulty 1 succeeds on the first nonce, so stop and found race.
    for _ in 0..20 {
        let sealer = Sealer::from_config(config(2));
        let (handle, stop) = stop_channel();
        let stopper = tokio::spawn(async move { handle.stop() });

        let result = sealer.seal(&header(2, 1), &stop, false).await.expect("seal");
        stopper.await.expect("join");
        if let Some(sealed) = result {
            sealer.verify_seal(&sealed).expect("valid seal");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_is_transparent() {
    let sealer = Arc::new(Sealer::from_config(config(1)));
    let (handle, stop) = stop_channel();

    let task = {
        let sealer = sealer.clone();
        tokio::spawn(async move { sealer.seal(&header(5, u64::MAX), &stop, false).await })
    };
    for threads in [2, 3, 1] {
        tokio::time::sleep(Duration::from_millis(20)).await;
        sealer.set_threads(threads);
    }
    handle.stop();

    let result = tokio::time::timeout(WAIT, task)
        .await
        .expect("seal timed out")
        .expect("join");
    assert!(matches!(result, Ok(None)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_then_find() {
    let sealer = Arc::new(Sealer::from_config(config(1)));

    let task = {
        let sealer = sealer.clone();
        tokio::spawn(async move { sealer.seal(&header(6, 32), &StopSignal::never(), false).await })
    };
    sealer.set_threads(2);

    let sealed = tokio::time::timeout(WAIT, task)
        .await
        .expect("seal timed out")
        .expect("join")
        .expect("seal")
        .expect("sealed header");
    sealer.verify_seal(&sealed).expect("valid seal");
}

#[tokio::test]
async fn broadcast_node_ignores_difficulty() {
    let sealer = Sealer::from_config(config(8));
    let candidate = Header::new(H256::zero(), 9, U256::MAX, TEST_TIMESTAMP);

    let sealed = sealer
        .seal(&candidate, &StopSignal::never(), true)
        .await
        .expect("seal")
        .expect("sealed header");

    assert_eq!(sealer.meter().count(), 1);
    // The difficulty was never met, only bypassed.
    assert!(matches!(sealer.verify_seal(&sealed), Err(PowError::InvalidPoW)));
}

#[test]
fn dataset_outlives_eviction() {
    let hasher = Blake3Hasher::default();
    let datasets = DatasetCache::new(SeededGenerator::new(4096), 1);

    let held = datasets.dataset(epoch_of(0, 64));
    let before = hasher.hash(&held, &H256::repeat_byte(2), 7);
    // Requesting another epoch evicts the held one from the cache.
    let _other = datasets.dataset(epoch_of(64, 64));
    assert_eq!(datasets.cached_epochs(), vec![1]);
    assert_eq!(hasher.hash(&held, &H256::repeat_byte(2), 7), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sealed_header_survives_json() {
    let sealer = Sealer::from_config(config(2));
    let parent_hash = H256::from(rand::random::<[u8; 32]>());
    let candidate = Header::new(parent_hash, 77, U256::from(4u64), TEST_TIMESTAMP);

    let sealed = sealer
        .seal(&candidate, &StopSignal::never(), false)
        .await
        .expect("seal")
        .expect("sealed header");

    // Seal hash is the domain-separated hash of the unsealed encoding.
    let expected = powseal_crypto::blake3::derive_key(
        powseal_crypto::blake3::contexts::HEADER_SEAL_HASH,
        &sealed.encode_no_nonce(),
    );
    assert_eq!(sealed.hash_no_nonce().as_bytes(), &expected);
    assert_eq!(hex::encode(sealed.hash().as_bytes()).len(), 64);

    let json = serde_json::to_string(&sealed).expect("serialize");
    let decoded: Header = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, sealed);
    sealer.verify_seal(&decoded).expect("valid seal");
}

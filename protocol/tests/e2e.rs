//! End-to-end integration tests for the threshold proof protocol.
//!
//! These tests drive the public [`ProofService`] API the way the node does:
//! store a balance, request a proof, ship the proof around as bytes or JSON,
//! verify it. Each test builds its own service, except the randomized cases,
//! which share one key pair and use distinct identities per balance.

use std::sync::Arc;
use std::thread;

use zkbalance_protocol::config::PROOF_LENGTH;
use zkbalance_protocol::service::ProofService;
use zkbalance_protocol::store::BalanceStore;
use zkbalance_protocol::zkp::{
    KeyManager, KeyStore, SledKeyStore, ThresholdProof, ThresholdRelation, Verdict,
};
use zkbalance_protocol::ProtocolError;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Fresh service with in-memory keys.
fn setup() -> ProofService {
    let relation = Arc::new(ThresholdRelation::new().expect("relation"));
    ProofService::new(
        Arc::new(BalanceStore::new()),
        Arc::new(KeyManager::new(relation)),
    )
}

/// Service whose key pair is persisted in a sled database at `path`.
fn setup_persistent(path: &std::path::Path) -> (ProofService, Arc<SledKeyStore>) {
    let relation = Arc::new(ThresholdRelation::new().expect("relation"));
    let store = Arc::new(SledKeyStore::open(path).expect("open key store"));
    let keys = KeyManager::with_store(relation, Arc::clone(&store) as Arc<dyn KeyStore>);
    (
        ProofService::new(Arc::new(BalanceStore::new()), Arc::new(keys)),
        store,
    )
}

// ---------------------------------------------------------------------------
// 1. Reference Scenarios
// ---------------------------------------------------------------------------

#[test]
fn alice_proves_above_threshold() {
    let svc = setup();
    svc.store_balance("alice", 200);

    let proof = svc.request_proof("alice", 150).unwrap();
    assert_eq!(svc.verify_proof(150, &proof).unwrap(), Verdict::Valid);
}

#[test]
fn bob_proves_exact_threshold() {
    let svc = setup();
    svc.store_balance("bob", 100);

    let proof = svc.request_proof("bob", 100).unwrap();
    assert_eq!(svc.verify_proof(100, &proof).unwrap(), Verdict::Valid);
}

#[test]
fn charlie_below_threshold_is_rejected() {
    let svc = setup();
    svc.store_balance("charlie", 75);

    match svc.request_proof("charlie", 100) {
        Err(ProtocolError::ConstraintUnsatisfied { threshold }) => assert_eq!(threshold, 100),
        other => panic!("expected ConstraintUnsatisfied, got {:?}", other),
    }
}

#[test]
fn dave_unknown_identity_is_not_found() {
    let svc = setup();

    match svc.request_proof("dave", 1) {
        Err(ProtocolError::NotFound(identity)) => assert_eq!(identity, "dave"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn proof_does_not_verify_for_higher_threshold() {
    let svc = setup();
    svc.store_balance("alice", 200);

    let proof = svc.request_proof("alice", 150).unwrap();
    assert_eq!(svc.verify_proof(151, &proof).unwrap(), Verdict::Invalid);
}

// ---------------------------------------------------------------------------
// 2. Key Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn proofs_issued_before_and_after_share_keys() {
    let svc = setup();
    svc.store_balance("alice", 1_000);

    let first = svc.request_proof("alice", 10).unwrap();
    let second = svc.request_proof("alice", 900).unwrap();

    assert_eq!(first.key_id(), second.key_id());
    assert!(svc.verify_proof(10, &first).unwrap().is_valid());
    assert!(svc.verify_proof(900, &second).unwrap().is_valid());
}

#[test]
fn proof_from_other_deployment_is_key_mismatch() {
    let issuer = setup();
    let verifier = setup();
    issuer.store_balance("alice", 200);

    let proof = issuer.request_proof("alice", 150).unwrap();
    assert_ne!(issuer.key_id().unwrap(), verifier.key_id().unwrap());
    assert!(matches!(
        verifier.verify_proof(150, &proof),
        Err(ProtocolError::KeyMismatch { .. })
    ));
}

#[test]
fn persisted_keys_verify_proofs_across_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (bytes, key_id) = {
        let (svc, store) = setup_persistent(dir.path());
        svc.store_balance("alice", 200);
        let proof = svc.request_proof("alice", 150).unwrap();
        assert!(store.contains(&svc.relation_hash()).unwrap());
        (proof.to_bytes(), proof.key_id())
    };

    // Balances are not durable, keys are.
    let (restarted, _store) = setup_persistent(dir.path());
    assert_eq!(restarted.key_id().unwrap(), key_id);
    assert_eq!(
        restarted.verify_proof_bytes(150, &bytes).unwrap(),
        Verdict::Valid
    );
    assert!(matches!(
        restarted.request_proof("alice", 150),
        Err(ProtocolError::NotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// 3. Transport
// ---------------------------------------------------------------------------

#[test]
fn proof_survives_bytes_and_json_transport() {
    let svc = setup();
    svc.store_balance("alice", 5_000);
    let proof = svc.request_proof("alice", 4_999).unwrap();

    let bytes = proof.to_bytes();
    assert_eq!(bytes.len(), PROOF_LENGTH);
    assert_eq!(svc.verify_proof_bytes(4_999, &bytes).unwrap(), Verdict::Valid);

    let json = serde_json::to_string(&proof).unwrap();
    let decoded: ThresholdProof = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, proof);
    assert_eq!(svc.verify_proof(4_999, &decoded).unwrap(), Verdict::Valid);
}

#[test]
fn tampered_proof_never_verifies_as_valid() {
    let svc = setup();
    svc.store_balance("alice", 200);
    let mut bytes = svc.request_proof("alice", 150).unwrap().to_bytes();

    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    // Flipping a bit either breaks point decoding or the pairing check.
    match svc.verify_proof_bytes(150, &bytes) {
        Ok(verdict) => assert_eq!(verdict, Verdict::Invalid),
        Err(ProtocolError::MalformedProof(_)) => {}
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn truncated_proof_is_malformed() {
    let svc = setup();
    assert!(matches!(
        svc.verify_proof_bytes(1, &[0u8; 16]),
        Err(ProtocolError::MalformedProof(_))
    ));
}

// ---------------------------------------------------------------------------
// 4. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_identities_prove_and_verify() {
    let svc = Arc::new(setup());

    let handles: Vec<_> = (0..4i64)
        .map(|i| {
            let svc = Arc::clone(&svc);
            thread::spawn(move || {
                let identity = format!("user-{}", i);
                let balance = 1_000 + i * 100;
                svc.store_balance(&identity, balance);

                let proof = svc.request_proof(&identity, balance).unwrap();
                assert_eq!(svc.verify_proof(balance, &proof).unwrap(), Verdict::Valid);
                proof.key_id()
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]), "one key pair for all callers");
    assert_eq!(svc.store().len(), 4);
}

// ---------------------------------------------------------------------------
// 5. Randomized Proving
// ---------------------------------------------------------------------------

mod randomized {
    use super::*;
    use once_cell::sync::Lazy;
    use proptest::prelude::*;

    /// One key pair for every case; setup dominates the cost of a case.
    static SERVICE: Lazy<ProofService> = Lazy::new(setup);

    fn value() -> impl Strategy<Value = i64> {
        prop_oneof![
            1 => prop_oneof![Just(0i64), Just(1), Just(i64::MAX - 1), Just(i64::MAX)],
            3 => 0..=i64::MAX,
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(6))]

        #[test]
        fn proof_verifies_only_at_its_own_threshold(
            (balance, threshold) in value().prop_flat_map(|b| (Just(b), 0..=b)),
            other in value(),
        ) {
            prop_assume!(other != threshold);
            let identity = format!("holder-{}", balance);
            SERVICE.store_balance(&identity, balance);

            let proof = SERVICE.request_proof(&identity, threshold).unwrap();
            prop_assert_eq!(SERVICE.verify_proof(threshold, &proof).unwrap(), Verdict::Valid);
            prop_assert_eq!(SERVICE.verify_proof(other, &proof).unwrap(), Verdict::Invalid);
        }

        #[test]
        fn threshold_above_balance_is_refused(
            (balance, threshold) in (0..i64::MAX).prop_flat_map(|b| (Just(b), (b + 1)..=i64::MAX)),
        ) {
            let identity = format!("short-{}", balance);
            SERVICE.store_balance(&identity, balance);

            match SERVICE.request_proof(&identity, threshold) {
                Err(ProtocolError::ConstraintUnsatisfied { threshold: t }) => {
                    prop_assert_eq!(t, threshold)
                }
                other => prop_assert!(false, "expected ConstraintUnsatisfied, got {:?}", other),
            }
        }
    }
}

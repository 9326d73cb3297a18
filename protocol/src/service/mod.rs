//! # Protocol Orchestrator
//!
//! [`ProofService`] ties the balance store to the key manager, prover and
//! verifier. Each call runs one [`Attempt`] from start to a resting state and
//! maps every failure 1:1 onto a [`ProtocolError`] variant.
//!
//! The service keeps no per-attempt state between calls. The proof goes back
//! to the caller and is not retained; the verify half shares nothing with the
//! prove half except the cached key pair.
//!
//! Every method is synchronous and CPU-bound. Async callers should run them
//! on a blocking pool.

pub mod attempt;

pub use attempt::{Attempt, AttemptState};

use std::sync::Arc;

use crate::error::{ProtocolError, ProtocolResult};
use crate::store::BalanceStore;
use crate::zkp::{
    KeyId, KeyManager, RelationHash, ThresholdProof, ThresholdProver, ThresholdVerifier, Verdict,
};

/// Entry point for store, prove and verify operations.
#[derive(Debug, Clone)]
pub struct ProofService {
    store: Arc<BalanceStore>,
    keys: Arc<KeyManager>,
}

impl ProofService {
    pub fn new(store: Arc<BalanceStore>, keys: Arc<KeyManager>) -> Self {
        Self { store, keys }
    }

    pub fn store(&self) -> &BalanceStore {
        &self.store
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// Record `balance` for `identity`, replacing any previous value.
    ///
    /// Always succeeds. Range checks happen when a proof is requested.
    pub fn store_balance(&self, identity: &str, balance: i64) {
        self.store.put(identity, balance);
        tracing::info!(identity, "balance stored");
    }

    /// Prove that `identity` holds at least `threshold`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::NotFound`] if the identity has no stored balance.
    /// - [`ProtocolError::ConstraintUnsatisfied`] if the balance is below
    ///   `threshold`.
    /// - [`ProtocolError::InvalidWitness`] if either value is negative.
    /// - [`ProtocolError::SetupFault`], [`ProtocolError::KeyStore`] or
    ///   [`ProtocolError::ProverFault`] on internal failures.
    pub fn request_proof(&self, identity: &str, threshold: i64) -> ProtocolResult<ThresholdProof> {
        let balance = self.store.get(identity).map_err(|e| {
            tracing::info!(identity, threshold, "proof requested for unknown identity");
            e
        })?;

        let mut attempt = Attempt::stored(identity, threshold);
        attempt.advance(AttemptState::ProofRequested)?;

        let keys = self.keys.get_or_create_keys()?;
        let result =
            ThresholdProver::new(self.keys.relation(), &keys).prove(balance, threshold);

        match result {
            Ok(proof) => {
                attempt.advance(AttemptState::ProofIssued)?;
                tracing::info!(identity, threshold, key_id = %proof.key_id(), "proof issued");
                Ok(proof)
            }
            Err(e @ ProtocolError::ConstraintUnsatisfied { .. }) => {
                attempt.advance(AttemptState::Rejected)?;
                tracing::info!(identity, threshold, "proof rejected: balance below threshold");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(identity, threshold, kind = e.kind(), "proof request failed: {}", e);
                Err(e)
            }
        }
    }

    /// Verify `proof` against the public `threshold`.
    ///
    /// [`Verdict::Invalid`] is an ordinary answer, not an error.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidWitness`] if `threshold` is negative.
    /// - [`ProtocolError::KeyMismatch`] if the proof came from another key pair.
    /// - [`ProtocolError::MalformedProof`] if the proof cannot be decoded.
    pub fn verify_proof(&self, threshold: i64, proof: &ThresholdProof) -> ProtocolResult<Verdict> {
        let mut attempt = Attempt::issued(threshold);
        attempt.advance(AttemptState::VerifyRequested)?;

        let keys = self.keys.get_or_create_keys()?;
        let verdict = ThresholdVerifier::new(&keys).verify(threshold, proof)?;

        match verdict {
            Verdict::Valid => attempt.advance(AttemptState::Verified)?,
            Verdict::Invalid => attempt.advance(AttemptState::Rejected)?,
        }
        tracing::info!(threshold, verdict = ?verdict, "proof verified");
        Ok(verdict)
    }

    /// Decode `bytes` as a [`ThresholdProof`] and verify it.
    pub fn verify_proof_bytes(&self, threshold: i64, bytes: &[u8]) -> ProtocolResult<Verdict> {
        let proof = ThresholdProof::from_bytes(bytes)?;
        self.verify_proof(threshold, &proof)
    }

    /// Fingerprint of the active key pair, running setup if needed.
    pub fn key_id(&self) -> ProtocolResult<KeyId> {
        Ok(self.keys.get_or_create_keys()?.id())
    }

    pub fn relation_hash(&self) -> RelationHash {
        *self.keys.relation().hash()
    }
}

//! # Groth16 Proof Verification
//!
//! The verifier side of the threshold proof. Verification is a pure function
//! of (verifying key, threshold, proof): no shared mutable state, no side
//! effects beyond logging. Groth16 verification is three pairings plus a
//! one-element MSM, so it is constant-time with respect to circuit size.
//!
//! Outcomes:
//!
//! - [`Verdict::Valid`] / [`Verdict::Invalid`] for a well-formed proof.
//!   `Invalid` is a normal negative answer, not an error.
//! - [`ProtocolError::KeyMismatch`] when the proof was made with a different
//!   key pair. This must not happen in a correctly operated deployment and is
//!   logged at `error`.
//! - [`ProtocolError::MalformedProof`] / [`ProtocolError::InvalidWitness`]
//!   for undecodable proofs or out-of-range thresholds.

use ark_bn254::{Bn254, Fr};
use ark_groth16::Groth16;
use ark_relations::r1cs::SynthesisError;
use ark_snark::SNARK;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

use super::keys::KeyPair;
use super::proof::ThresholdProof;
use super::relation;
use super::witness::validate_threshold;

/// Result of checking a well-formed proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The proof attests that a balance of at least the threshold was known.
    Valid,
    /// The proof does not verify for this threshold.
    Invalid,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Checks threshold proofs against a fixed key pair.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdVerifier<'a> {
    keys: &'a KeyPair,
}

impl<'a> ThresholdVerifier<'a> {
    pub fn new(keys: &'a KeyPair) -> Self {
        Self { keys }
    }

    /// Verify `proof` for the public `threshold`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidWitness`] if `threshold` is negative.
    /// - [`ProtocolError::KeyMismatch`] if the proof carries another key id,
    ///   or the verifying key expects a different number of public inputs.
    /// - [`ProtocolError::MalformedProof`] if the proof cannot be decoded.
    pub fn verify(&self, threshold: i64, proof: &ThresholdProof) -> ProtocolResult<Verdict> {
        let threshold = validate_threshold(threshold)?;

        if proof.key_id() != self.keys.id() {
            tracing::error!(
                expected = %self.keys.id(),
                got = %proof.key_id(),
                "proof was produced with a different key pair"
            );
            return Err(ProtocolError::KeyMismatch {
                expected: self.keys.id().to_hex(),
                got: proof.key_id().to_hex(),
            });
        }

        let ark_proof = proof.to_ark_proof()?;
        let inputs = relation::public_inputs(threshold);

        let valid = <Groth16<Bn254> as SNARK<Fr>>::verify_with_processed_vk(
            self.keys.prepared_verifying_key(),
            &inputs,
            &ark_proof,
        )
        .map_err(|e| match e {
            SynthesisError::MalformedVerifyingKey => {
                tracing::error!(key_id = %self.keys.id(), "verifying key does not fit the relation");
                ProtocolError::KeyMismatch {
                    expected: format!("{} public inputs", inputs.len()),
                    got: format!("{} public inputs", self.keys.public_input_count()),
                }
            }
            other => ProtocolError::MalformedProof(format!("Groth16 verification failed: {}", other)),
        })?;

        Ok(if valid { Verdict::Valid } else { Verdict::Invalid })
    }

    /// Decode `bytes` and verify.
    pub fn verify_bytes(&self, threshold: i64, bytes: &[u8]) -> ProtocolResult<Verdict> {
        let proof = ThresholdProof::from_bytes(bytes)?;
        self.verify(threshold, &proof)
    }
}

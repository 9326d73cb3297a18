//! # Groth16 Proof Generation
//!
//! Wraps `ark-groth16` to turn a (balance, threshold) pair into a
//! [`ThresholdProof`]. The workflow is:
//!
//! 1. Build a [`Witness`], which range-checks both values.
//! 2. Evaluate the constraint natively. An unsatisfied witness fails here,
//!    deterministically, before any proving work.
//! 3. Synthesize the populated circuit and check its shape and
//!    satisfiability against the relation.
//! 4. Invoke `Groth16::prove` and wrap the result with the key id.
//!
//! The prover reads nothing but its arguments: it does not touch the balance
//! store, and the only shared state it sees is the immutable key pair.

use ark_bn254::{Bn254, Fr};
use ark_groth16::Groth16;
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};

use crate::error::{ProtocolError, ProtocolResult};

use super::keys::KeyPair;
use super::proof::ThresholdProof;
use super::relation::ThresholdRelation;
use super::witness::Witness;

/// Produces threshold proofs with a fixed relation and key pair.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdProver<'a> {
    relation: &'a ThresholdRelation,
    keys: &'a KeyPair,
}

impl<'a> ThresholdProver<'a> {
    pub fn new(relation: &'a ThresholdRelation, keys: &'a KeyPair) -> Self {
        Self { relation, keys }
    }

    /// Prove `threshold <= balance` using thread-local randomness.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidWitness`] if either value is out of range.
    /// - [`ProtocolError::ConstraintUnsatisfied`] if `threshold > balance`.
    /// - [`ProtocolError::ProverFault`] if proof construction fails on a
    ///   satisfied witness.
    pub fn prove(&self, balance: i64, threshold: i64) -> ProtocolResult<ThresholdProof> {
        let mut rng = ark_std::rand::thread_rng();
        self.prove_with_rng(balance, threshold, &mut rng)
    }

    /// Same as [`ThresholdProver::prove`] with caller-supplied randomness.
    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        &self,
        balance: i64,
        threshold: i64,
        rng: &mut R,
    ) -> ProtocolResult<ThresholdProof> {
        let witness = Witness::new(balance, threshold)?;
        if !witness.is_satisfied() {
            return Err(ProtocolError::ConstraintUnsatisfied { threshold });
        }

        let circuit = self.relation.synthesize(&witness)?;

        let proof = <Groth16<Bn254> as SNARK<Fr>>::prove(self.keys.proving_key(), circuit, rng)
            .map_err(|e| {
                tracing::error!(key_id = %self.keys.id(), "Groth16 proving failed: {}", e);
                ProtocolError::ProverFault(format!("Groth16 proof generation failed: {}", e))
            })?;

        ThresholdProof::new(self.keys.id(), &proof)
    }
}

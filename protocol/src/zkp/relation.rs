//! # Threshold Relation (R1CS)
//!
//! The statement being proved is:
//!
//! ```text
//! "I know a balance such that threshold <= balance"
//! ```
//!
//! with `threshold` public and `balance` private.
//!
//! ## Constraint breakdown
//!
//! Let `delta = balance - threshold`. Comparison is meaningful only in the
//! integers, not modulo `p`, so both `balance` and `delta` are bit-decomposed
//! into [`RANGE_BITS`] (64) boolean witnesses and recomposed:
//!
//! 1. Each bit `b_i` is boolean: `b_i * (1 - b_i) = 0`.
//! 2. `sum(b_i * 2^i) = value`.
//!
//! Because `2^64` is far below `|Fr|`, a satisfied system implies
//! `0 <= balance < 2^64` and `0 <= delta < 2^64` in the integers, hence
//! `threshold <= balance`. If `threshold > balance`, `delta` wraps to a
//! ~254-bit field element with no 64-bit decomposition and the system is
//! unsatisfiable.
//!
//! Total constraints: 2 * (64 boolean + 1 recomposition) = ~130.
//!
//! ## Public inputs (in order)
//!
//! | index | value |
//! |-------|-------|
//! | 0     | Fr::from(threshold) |
//!
//! ## Shape
//!
//! The constraint topology is fixed at compile time: one public input, one
//! private balance, 128 bit witnesses. [`ThresholdRelation`] records the
//! shape of the blank circuit once and refuses any populated circuit whose
//! shape differs, so a single key pair stays valid for every witness.

use std::fmt;

use ark_bn254::Fr;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError, SynthesisMode,
};

use crate::config::{RANGE_BITS, RELATION_DOMAIN, RELATION_VERSION};
use crate::error::{ProtocolError, ProtocolResult};

use super::witness::Witness;

// ---------------------------------------------------------------------------
// Circuit definition
// ---------------------------------------------------------------------------

/// Groth16 R1CS circuit proving `threshold <= balance`.
///
/// Fields are `Option<_>` so the struct can be built with `None` during key
/// generation, where only the topology matters.
#[derive(Clone, Default)]
pub struct ThresholdCircuit {
    /// The balance (private witness).
    balance: Option<u64>,
    /// The minimum the balance must cover (public input).
    threshold: Option<u64>,
}

impl ThresholdCircuit {
    /// Construct a blank circuit for key generation.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Construct a fully-populated circuit from a validated witness.
    pub fn from_witness(witness: &Witness) -> Self {
        Self {
            balance: Some(witness.balance()),
            threshold: Some(witness.threshold()),
        }
    }
}

impl ConstraintSynthesizer<Fr> for ThresholdCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public input: the threshold.
        let threshold_var = FpVar::<Fr>::new_input(ark_relations::ns!(cs, "threshold"), || {
            self.threshold
                .map(Fr::from)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        // Private witness: the balance.
        let balance_var = FpVar::<Fr>::new_witness(ark_relations::ns!(cs, "balance"), || {
            self.balance
                .map(Fr::from)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        // balance in [0, 2^64)
        enforce_range(&cs, &balance_var, self.balance)?;

        // delta = balance - threshold in [0, 2^64)
        let delta_var = &balance_var - &threshold_var;
        let delta = match (self.balance, self.threshold) {
            // Wrapping keeps the assignment defined when threshold > balance;
            // the recomposition check then fails instead of the allocation.
            (Some(b), Some(t)) => Some(b.wrapping_sub(t)),
            _ => None,
        };
        enforce_range(&cs, &delta_var, delta)?;

        Ok(())
    }
}

/// Allocate `RANGE_BITS` boolean witnesses for `value`, recompose them, and
/// enforce the recomposition equals `var`.
fn enforce_range(
    cs: &ConstraintSystemRef<Fr>,
    var: &FpVar<Fr>,
    value: Option<u64>,
) -> Result<(), SynthesisError> {
    let mut reconstructed = FpVar::<Fr>::zero();
    let mut power_of_two = FpVar::<Fr>::one();
    let two = FpVar::<Fr>::constant(Fr::from(2u64));

    for i in 0..RANGE_BITS {
        let bit = Boolean::<Fr>::new_witness(ark_relations::ns!(cs, "range_bit"), || {
            value
                .map(|v| (v >> i) & 1 == 1)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        reconstructed += FpVar::<Fr>::from(bit) * &power_of_two;
        power_of_two *= &two;
    }

    reconstructed.enforce_equal(var)
}

/// Public input vector the Groth16 verifier expects for `threshold`.
///
/// Ordering MUST match the `new_input` allocations in `generate_constraints`.
pub fn public_inputs(threshold: u64) -> Vec<Fr> {
    vec![Fr::from(threshold)]
}

// ---------------------------------------------------------------------------
// Shape and hash
// ---------------------------------------------------------------------------

/// Variable and constraint counts of a synthesized circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelationShape {
    /// Public inputs, not counting the implicit constant `1`.
    pub public_inputs: usize,
    /// Private witness variables.
    pub private_witnesses: usize,
    /// R1CS constraints.
    pub constraints: usize,
}

impl RelationShape {
    fn of_constraint_system(cs: &ConstraintSystemRef<Fr>) -> Self {
        Self {
            public_inputs: cs.num_instance_variables().saturating_sub(1),
            private_witnesses: cs.num_witness_variables(),
            constraints: cs.num_constraints(),
        }
    }
}

/// BLAKE3 digest identifying the relation's topology. Key pairs are
/// persisted under this hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationHash([u8; 32]);

impl RelationHash {
    fn compute(shape: &RelationShape) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(RELATION_DOMAIN.as_bytes());
        hasher.update(&RELATION_VERSION.to_le_bytes());
        hasher.update(&(RANGE_BITS as u64).to_le_bytes());
        hasher.update(&(shape.public_inputs as u64).to_le_bytes());
        hasher.update(&(shape.private_witnesses as u64).to_le_bytes());
        hasher.update(&(shape.constraints as u64).to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for RelationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RelationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationHash({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// ThresholdRelation
// ---------------------------------------------------------------------------

/// The immutable relation instance shared by every prove and verify call.
///
/// Built once at startup. Holds the shape of the blank circuit and the
/// derived [`RelationHash`].
#[derive(Debug, Clone)]
pub struct ThresholdRelation {
    shape: RelationShape,
    hash: RelationHash,
}

impl ThresholdRelation {
    /// Synthesize the blank circuit in setup mode and record its shape.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::SetupFault`] if synthesis fails or the relation does
    /// not expose exactly one public input.
    pub fn new() -> ProtocolResult<Self> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_mode(SynthesisMode::Setup);
        ThresholdCircuit::blank()
            .generate_constraints(cs.clone())
            .map_err(|e| ProtocolError::SetupFault(format!("relation synthesis failed: {}", e)))?;

        let shape = RelationShape::of_constraint_system(&cs);
        if shape.public_inputs != 1 {
            return Err(ProtocolError::SetupFault(format!(
                "relation must expose exactly one public input, found {}",
                shape.public_inputs
            )));
        }

        let hash = RelationHash::compute(&shape);
        tracing::debug!(
            constraints = shape.constraints,
            witnesses = shape.private_witnesses,
            relation = %hash,
            "threshold relation synthesized"
        );
        Ok(Self { shape, hash })
    }

    /// Shape of the blank circuit.
    pub fn shape(&self) -> &RelationShape {
        &self.shape
    }

    /// Hash of the relation's topology.
    pub fn hash(&self) -> &RelationHash {
        &self.hash
    }

    /// Circuit with empty witness slots, used for key generation.
    pub fn blank_circuit(&self) -> ThresholdCircuit {
        ThresholdCircuit::blank()
    }

    /// Build the populated circuit for `witness` and check it against the
    /// relation before any proving work is done.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidWitness`] if the populated circuit's shape
    ///   differs from the relation's.
    /// - [`ProtocolError::ConstraintUnsatisfied`] if the assignment violates
    ///   any constraint.
    /// - [`ProtocolError::ProverFault`] if synthesis itself fails.
    pub fn synthesize(&self, witness: &Witness) -> ProtocolResult<ThresholdCircuit> {
        let circuit = ThresholdCircuit::from_witness(witness);

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit
            .clone()
            .generate_constraints(cs.clone())
            .map_err(|e| ProtocolError::ProverFault(format!("witness synthesis failed: {}", e)))?;

        let shape = RelationShape::of_constraint_system(&cs);
        if shape != self.shape {
            return Err(ProtocolError::InvalidWitness(format!(
                "witness shape {:?} does not match relation shape {:?}",
                shape, self.shape
            )));
        }

        let satisfied = cs
            .is_satisfied()
            .map_err(|e| ProtocolError::ProverFault(format!("satisfiability check failed: {}", e)))?;
        if !satisfied {
            return Err(ProtocolError::ConstraintUnsatisfied {
                threshold: witness.threshold() as i64,
            });
        }

        Ok(circuit)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

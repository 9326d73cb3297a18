//! Error types for the threshold proof protocol.
//!
//! Every fallible operation in the crate returns a [`ProtocolError`]. The
//! variants map one-to-one onto caller-visible outcomes; distinct causes are
//! never collapsed into a generic failure. Note that a proof which fails the
//! pairing check is *not* an error: it is [`crate::zkp::Verdict::Invalid`].

use thiserror::Error;

/// Errors that can occur while storing balances, proving, or verifying.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The identity has no balance in the store.
    #[error("balance not found for identity {0:?}")]
    NotFound(String),

    /// The balance is below the requested threshold. This is a genuine
    /// negative answer of the protocol, not a fault.
    #[error("constraint unsatisfied: balance is below threshold {threshold}")]
    ConstraintUnsatisfied {
        /// The public threshold that could not be met.
        threshold: i64,
    },

    /// A balance or threshold is outside the accepted range, or the witness
    /// does not have the relation's shape.
    #[error("invalid witness: {0}")]
    InvalidWitness(String),

    /// The proof bytes could not be decoded.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// The proof, or a loaded key pair, belongs to a different key pair or
    /// relation than the one in use.
    #[error("key mismatch: expected {expected}, got {got}")]
    KeyMismatch {
        /// Fingerprint the verifier holds.
        expected: String,
        /// Fingerprint carried by the proof or loaded key material.
        got: String,
    },

    /// Proof construction failed on a satisfied witness.
    #[error("prover fault: {0}")]
    ProverFault(String),

    /// Key generation or relation synthesis failed.
    #[error("setup fault: {0}")]
    SetupFault(String),

    /// The durable key store failed to read or write.
    #[error("key store error: {0}")]
    KeyStore(String),

    /// An attempt was driven through an illegal state transition.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// State the attempt was in.
        from: String,
        /// State that was requested.
        to: String,
    },
}

/// Convenience alias used across the crate.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl ProtocolError {
    /// Stable machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::NotFound(_) => "not_found",
            ProtocolError::ConstraintUnsatisfied { .. } => "constraint_unsatisfied",
            ProtocolError::InvalidWitness(_) => "invalid_witness",
            ProtocolError::MalformedProof(_) => "malformed_proof",
            ProtocolError::KeyMismatch { .. } => "key_mismatch",
            ProtocolError::ProverFault(_) => "prover_fault",
            ProtocolError::SetupFault(_) => "setup_fault",
            ProtocolError::KeyStore(_) => "key_store",
            ProtocolError::InvalidTransition { .. } => "invalid_transition",
        }
    }

    /// Whether the caller caused this error (bad input, unknown identity,
    /// insufficient balance) as opposed to a deployment or internal defect.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::NotFound(_)
                | ProtocolError::ConstraintUnsatisfied { .. }
                | ProtocolError::InvalidWitness(_)
                | ProtocolError::MalformedProof(_)
        )
    }
}

impl From<sled::Error> for ProtocolError {
    fn from(e: sled::Error) -> Self {
        ProtocolError::KeyStore(e.to_string())
    }
}

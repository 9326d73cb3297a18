//! # Zero-Knowledge Threshold Proofs
//!
//! Implements the proving system behind the service using Groth16 over the
//! BN254 curve. The statement is minimal: given a public `threshold`, the
//! prover demonstrates knowledge of a private `balance` with
//! `threshold <= balance`, without revealing the balance.
//!
//! ## Architecture
//!
//! ```text
//! relation.rs  — R1CS circuit, relation shape and hash (ThresholdRelation)
//! witness.rs   — range-checked (balance, threshold) pair (Witness)
//! keys.rs      — key pair and single-initialization cache (KeyPair, KeyManager)
//! keystore.rs  — durable key persistence (KeyStore, MemoryKeyStore, SledKeyStore)
//! proof.rs     — wire format of an issued proof (ThresholdProof)
//! prover.rs    — Groth16 proof generation (ThresholdProver)
//! verifier.rs  — Groth16 proof verification (ThresholdVerifier, Verdict)
//! ```
//!
//! ## Security Model
//!
//! - **Soundness**: Groth16 knowledge-soundness in the generic group model.
//! - **Zero-knowledge**: Groth16 proofs are perfectly zero-knowledge; the
//!   container adds only the key fingerprint.
//! - **Range check**: 64-bit decomposition of both the balance and the
//!   slack, with boolean enforcement on every limb. No wrap-around.
//!
//! The setup is per-relation and performed locally. In production, replace
//! it with an MPC-generated CRS and load it through a [`KeyStore`].

pub mod keys;
pub mod keystore;
pub mod proof;
pub mod prover;
pub mod relation;
pub mod verifier;
pub mod witness;

pub use keys::{KeyId, KeyManager, KeyPair};
pub use keystore::{KeyStore, MemoryKeyStore, SledKeyStore};
pub use proof::ThresholdProof;
pub use prover::ThresholdProver;
pub use relation::{RelationHash, RelationShape, ThresholdCircuit, ThresholdRelation};
pub use verifier::{ThresholdVerifier, Verdict};
pub use witness::Witness;

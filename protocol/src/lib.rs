//! # zkbalance Protocol
//!
//! Zero-knowledge threshold proofs over private balances. A client stores a
//! balance for an identity, asks for a proof that the balance is at least
//! some public threshold, and hands that proof to a verifier who learns the
//! threshold holds and nothing else.
//!
//! Groth16 over BN254 does the proving. Setup runs once per relation shape;
//! the resulting key pair is cached for the lifetime of the process and can
//! be persisted so that issued proofs survive a restart.
//!
//! ## Modules
//!
//! - **config** — protocol constants: relation version, value bounds, wire
//!   format lengths.
//! - **error** — the [`ProtocolError`] taxonomy.
//! - **store** — concurrent identity → balance map.
//! - **zkp** — relation, witness, key management, prover and verifier.
//! - **service** — the orchestrator that runs store/prove/verify attempts.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use zkbalance_protocol::service::ProofService;
//! use zkbalance_protocol::store::BalanceStore;
//! use zkbalance_protocol::zkp::{KeyManager, ThresholdRelation, Verdict};
//!
//! # fn main() -> Result<(), zkbalance_protocol::ProtocolError> {
//! let relation = Arc::new(ThresholdRelation::new()?);
//! let service = ProofService::new(
//!     Arc::new(BalanceStore::new()),
//!     Arc::new(KeyManager::new(relation)),
//! );
//!
//! service.store_balance("alice", 200);
//! let proof = service.request_proof("alice", 150)?;
//! assert_eq!(service.verify_proof(150, &proof)?, Verdict::Valid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod zkp;

pub use error::{ProtocolError, ProtocolResult};

//! # Protocol Configuration & Constants
//!
//! Every constant that shapes the threshold relation, the proof wire format,
//! or the service defaults lives here. Changing anything in the "Relation"
//! section changes the relation hash, which invalidates every persisted key
//! pair and every proof issued against it.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Library protocol version reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// Version tag mixed into the relation hash. Bump whenever the constraint
/// layout changes so stale keys are never loaded against the new relation.
pub const RELATION_VERSION: u32 = 1;

/// Domain separation tag for the relation hash.
pub const RELATION_DOMAIN: &str = "zkbalance/threshold-relation";

/// Width of the in-circuit range checks. Both the balance and the slack
/// `balance - threshold` are decomposed into this many bits, which keeps
/// every value far below the BN254 scalar modulus (~2^254).
pub const RANGE_BITS: usize = 64;

/// Smallest value accepted for a balance or threshold.
pub const MIN_VALUE: i64 = 0;

/// Largest value accepted for a balance or threshold.
pub const MAX_VALUE: i64 = i64::MAX;

// ---------------------------------------------------------------------------
// Proof Format
// ---------------------------------------------------------------------------

/// Leading byte of the serialized proof container.
pub const PROOF_FORMAT_VERSION: u8 = 1;

/// Length of a key fingerprint (BLAKE3 digest).
pub const KEY_ID_LENGTH: usize = 32;

/// Compressed Groth16 proof over BN254: A (G1, 32) + B (G2, 64) + C (G1, 32).
pub const GROTH16_PROOF_LENGTH: usize = 128;

/// Total serialized proof length: version byte + key id + Groth16 proof.
pub const PROOF_LENGTH: usize = 1 + KEY_ID_LENGTH + GROTH16_PROOF_LENGTH;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// sled tree holding persisted key pairs, keyed by relation hash.
pub const KEY_PAIR_TREE: &str = "key_pairs";

// ---------------------------------------------------------------------------
// Networking Defaults
// ---------------------------------------------------------------------------

/// Default port for the HTTP API.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

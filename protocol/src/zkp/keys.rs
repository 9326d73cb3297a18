//! # Key Lifecycle
//!
//! One relation, one key pair, valid for the lifetime of every proof that
//! must later verify. The [`KeyManager`] owns the pair and hands out shared
//! references; it never re-runs setup once a pair exists.
//!
//! ## Initialization
//!
//! The pair is created lazily on the first call to
//! [`KeyManager::get_or_create_keys`] behind a `OnceCell`:
//!
//! 1. Concurrent first callers block until the single initializer finishes,
//!    then share its result.
//! 2. If a [`KeyStore`] is attached, a pair persisted under the relation hash
//!    is loaded instead of generating a new one.
//! 3. Otherwise Groth16 setup runs with OS randomness. The toxic waste lives
//!    only inside `circuit_specific_setup` and is dropped when it returns.
//! 4. A failed attempt leaves the cell empty, so the next call retries.
//!
//! Without a store, a process restart produces a new pair and every proof
//! issued before the restart stops verifying.

use std::fmt;
use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};
use once_cell::sync::OnceCell;
use rand::rngs::OsRng;

use crate::config::KEY_ID_LENGTH;
use crate::error::{ProtocolError, ProtocolResult};

use super::keystore::KeyStore;
use super::relation::{RelationShape, ThresholdRelation};

// ---------------------------------------------------------------------------
// KeyId
// ---------------------------------------------------------------------------

/// BLAKE3 fingerprint of a compressed verifying key.
///
/// Every proof carries the id of the pair it was produced with, so a proof
/// checked against a different pair is reported as a mismatch rather than a
/// plain rejection.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; KEY_ID_LENGTH]);

impl KeyId {
    /// Wrap raw fingerprint bytes.
    pub fn from_bytes(bytes: [u8; KEY_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_ID_LENGTH] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn of_verifying_key(vk: &VerifyingKey<Bn254>) -> ProtocolResult<Self> {
        let mut buf = Vec::new();
        vk.serialize_compressed(&mut buf)
            .map_err(|e| ProtocolError::SetupFault(format!("vk serialization failed: {}", e)))?;
        Ok(Self(*blake3::hash(&buf).as_bytes()))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// Groth16 proving key plus the prepared verifying key derived from it.
///
/// Large but immutable. Shared behind an `Arc` for the lifetime of the node.
pub struct KeyPair {
    pk: ProvingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
    id: KeyId,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("id", &self.id).finish()
    }
}

impl KeyPair {
    /// Run Groth16 setup for `relation` using `rng`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::SetupFault`] if CRS generation fails.
    pub fn generate<R: RngCore + CryptoRng>(
        relation: &ThresholdRelation,
        rng: &mut R,
    ) -> ProtocolResult<Self> {
        let (pk, _vk) =
            Groth16::<Bn254>::circuit_specific_setup(relation.blank_circuit(), rng).map_err(
                |e| ProtocolError::SetupFault(format!("Groth16 setup failed: {}", e)),
            )?;
        Self::from_proving_key(pk)
    }

    fn from_proving_key(pk: ProvingKey<Bn254>) -> ProtocolResult<Self> {
        let pvk = <Groth16<Bn254> as SNARK<Fr>>::process_vk(&pk.vk)
            .map_err(|e| ProtocolError::SetupFault(format!("vk preparation failed: {}", e)))?;
        let id = KeyId::of_verifying_key(&pk.vk)?;
        Ok(Self { pk, pvk, id })
    }

    /// Fingerprint of this pair.
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// The proving key.
    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.pk
    }

    /// The verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.pk.vk
    }

    /// The verifying key with pairing precomputations.
    pub fn prepared_verifying_key(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.pvk
    }

    /// Whether the verifying key expects exactly the public inputs `shape`
    /// declares.
    pub fn matches_shape(&self, shape: &RelationShape) -> bool {
        self.public_input_count() == shape.public_inputs
    }

    /// Public inputs the verifying key expects, not counting the constant `1`.
    pub fn public_input_count(&self) -> usize {
        self.pk.vk.gamma_abc_g1.len().saturating_sub(1)
    }

    /// Compressed canonical encoding. The proving key embeds the verifying
    /// key, so this is the whole pair.
    pub fn to_bytes(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.pk
            .serialize_compressed(&mut buf)
            .map_err(|e| ProtocolError::KeyStore(format!("key pair serialization failed: {}", e)))?;
        Ok(buf)
    }

    /// Decode a pair produced by [`KeyPair::to_bytes`]. Curve points are
    /// validated.
    pub fn from_bytes(data: &[u8]) -> ProtocolResult<Self> {
        let pk = ProvingKey::<Bn254>::deserialize_compressed(data)
            .map_err(|e| ProtocolError::KeyStore(format!("corrupt key pair: {}", e)))?;
        Self::from_proving_key(pk)
    }

    /// Compressed encoding of the verifying key alone.
    pub fn verifying_key_bytes(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.pk
            .vk
            .serialize_compressed(&mut buf)
            .map_err(|e| ProtocolError::KeyStore(format!("vk serialization failed: {}", e)))?;
        Ok(buf)
    }
}

// ---------------------------------------------------------------------------
// KeyManager
// ---------------------------------------------------------------------------

/// Produces and caches the key pair bound to a [`ThresholdRelation`].
pub struct KeyManager {
    relation: Arc<ThresholdRelation>,
    store: Option<Arc<dyn KeyStore>>,
    keys: OnceCell<Arc<KeyPair>>,
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("relation", self.relation.hash())
            .field("persistent", &self.store.is_some())
            .field("keys", &self.keys.get().map(|k| k.id()))
            .finish()
    }
}

impl KeyManager {
    /// Key manager with in-process keys only.
    pub fn new(relation: Arc<ThresholdRelation>) -> Self {
        Self {
            relation,
            store: None,
            keys: OnceCell::new(),
        }
    }

    /// Key manager that loads from and saves to `store`.
    pub fn with_store(relation: Arc<ThresholdRelation>, store: Arc<dyn KeyStore>) -> Self {
        Self {
            relation,
            store: Some(store),
            keys: OnceCell::new(),
        }
    }

    /// The relation the keys are bound to.
    pub fn relation(&self) -> &ThresholdRelation {
        &self.relation
    }

    /// The cached pair, if initialization already happened.
    pub fn cached(&self) -> Option<Arc<KeyPair>> {
        self.keys.get().cloned()
    }

    /// Return the cached pair, creating it exactly once on first use.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::SetupFault`] if generation fails (retryable).
    /// - [`ProtocolError::KeyStore`] if the store cannot be read or written.
    /// - [`ProtocolError::KeyMismatch`] if the stored pair does not fit the
    ///   relation.
    pub fn get_or_create_keys(&self) -> ProtocolResult<Arc<KeyPair>> {
        self.keys
            .get_or_try_init(|| self.initialize().map(Arc::new))
            .cloned()
    }

    fn initialize(&self) -> ProtocolResult<KeyPair> {
        let relation_hash = self.relation.hash();

        if let Some(store) = &self.store {
            if let Some(keys) = store.load_keys(relation_hash)? {
                if !keys.matches_shape(self.relation.shape()) {
                    tracing::error!(
                        relation = %relation_hash,
                        key_id = %keys.id(),
                        "persisted key pair does not fit the relation"
                    );
                    return Err(ProtocolError::KeyMismatch {
                        expected: format!(
                            "{} public inputs",
                            self.relation.shape().public_inputs
                        ),
                        got: format!("{} public inputs", keys.public_input_count()),
                    });
                }
                tracing::info!(relation = %relation_hash, key_id = %keys.id(), "loaded persisted key pair");
                return Ok(keys);
            }
        }

        tracing::info!(relation = %relation_hash, "running Groth16 setup");
        let started = std::time::Instant::now();
        let keys = KeyPair::generate(&self.relation, &mut OsRng).map_err(|e| {
            tracing::error!(relation = %relation_hash, "key setup failed: {}", e);
            e
        })?;
        tracing::info!(
            relation = %relation_hash,
            key_id = %keys.id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "key pair generated"
        );

        if let Some(store) = &self.store {
            store.save_keys(relation_hash, &keys)?;
            tracing::info!(relation = %relation_hash, key_id = %keys.id(), "key pair persisted");
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zkp::keystore::MemoryKeyStore;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use std::thread;

    fn relation() -> Arc<ThresholdRelation> {
        Arc::new(ThresholdRelation::new().unwrap())
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let manager = KeyManager::new(relation());
        let first = manager.get_or_create_keys().unwrap();
        let second = manager.get_or_create_keys().unwrap();

        assert!(Arc::ptr_eq(&first, &second), "no hidden re-generation");
        assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
    }

    #[test]
    fn cached_is_empty_before_first_use() {
        let manager = KeyManager::new(relation());
        assert!(manager.cached().is_none());
        let keys = manager.get_or_create_keys().unwrap();
        assert_eq!(manager.cached().unwrap().id(), keys.id());
    }

    #[test]
    fn concurrent_first_access_runs_setup_once() {
        let manager = Arc::new(KeyManager::new(relation()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || manager.get_or_create_keys().unwrap().id())
            })
            .collect();

        let ids: Vec<KeyId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn independent_managers_produce_different_keys() {
        let relation = relation();
        let a = KeyManager::new(Arc::clone(&relation))
            .get_or_create_keys()
            .unwrap();
        let b = KeyManager::new(relation).get_or_create_keys().unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn key_pair_bytes_round_trip() {
        let relation = relation();
        let mut rng = StdRng::seed_from_u64(42);
        let keys = KeyPair::generate(&relation, &mut rng).unwrap();

        let restored = KeyPair::from_bytes(&keys.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.id(), keys.id());
        assert!(restored.matches_shape(relation.shape()));
    }

    #[test]
    fn corrupt_key_bytes_rejected() {
        assert!(matches!(
            KeyPair::from_bytes(&[0u8; 16]),
            Err(ProtocolError::KeyStore(_))
        ));
    }

    #[test]
    fn seeded_setup_is_reproducible() {
        let relation = relation();
        let a = KeyPair::generate(&relation, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = KeyPair::generate(&relation, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.id(), b.id());
    }

    /// Setup for a relation with two public inputs, standing in for key
    /// material persisted by an incompatible build.
    #[derive(Clone)]
    struct TwoInputCircuit;

    impl ark_relations::r1cs::ConstraintSynthesizer<Fr> for TwoInputCircuit {
        fn generate_constraints(
            self,
            cs: ark_relations::r1cs::ConstraintSystemRef<Fr>,
        ) -> Result<(), ark_relations::r1cs::SynthesisError> {
            use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget, fields::fp::FpVar};
            let a = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(1u64)))?;
            let b = FpVar::<Fr>::new_input(cs.clone(), || Ok(Fr::from(1u64)))?;
            a.enforce_equal(&b)
        }
    }

    #[test]
    fn persisted_pair_with_wrong_input_count_is_key_mismatch() {
        let relation = relation();
        let mut rng = StdRng::seed_from_u64(9);
        let (pk, _vk) = Groth16::<Bn254>::circuit_specific_setup(TwoInputCircuit, &mut rng).unwrap();
        let foreign = KeyPair::from_proving_key(pk).unwrap();
        assert_eq!(foreign.public_input_count(), 2);
        assert!(!foreign.matches_shape(relation.shape()));

        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());
        store.save_keys(relation.hash(), &foreign).unwrap();

        let manager = KeyManager::with_store(relation, store);
        match manager.get_or_create_keys() {
            Err(ProtocolError::KeyMismatch { expected, got }) => {
                assert_eq!(expected, "1 public inputs");
                assert_eq!(got, "2 public inputs");
            }
            other => panic!("expected KeyMismatch, got {:?}", other),
        }
        assert!(manager.cached().is_none(), "failed init leaves the cell empty");
    }

    #[test]
    fn store_backed_manager_reuses_persisted_keys() {
        let relation = relation();
        let store: Arc<dyn KeyStore> = Arc::new(MemoryKeyStore::new());

        let first = KeyManager::with_store(Arc::clone(&relation), Arc::clone(&store))
            .get_or_create_keys()
            .unwrap();
        // A fresh manager stands in for a restarted process.
        let second = KeyManager::with_store(relation, store)
            .get_or_create_keys()
            .unwrap();

        assert_eq!(first.id(), second.id());
    }
}

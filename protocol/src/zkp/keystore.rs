//! # Durable Key Storage
//!
//! Persisting the key pair keyed by the relation hash lets proofs issued
//! before a restart keep verifying afterwards.
//!
//! | Backend            | Durability                 |
//! |--------------------|----------------------------|
//! | [`MemoryKeyStore`] | process lifetime (tests)   |
//! | [`SledKeyStore`]   | on disk, sled tree `key_pairs` |
//!
//! Values are the compressed canonical encoding from [`KeyPair::to_bytes`].

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use sled::{Db, Tree};

use crate::config::KEY_PAIR_TREE;
use crate::error::ProtocolResult;

use super::keys::KeyPair;
use super::relation::RelationHash;

/// Durable key-value interface for key pairs.
pub trait KeyStore: Send + Sync {
    /// Persist `keys` under `relation`, replacing any previous entry.
    fn save_keys(&self, relation: &RelationHash, keys: &KeyPair) -> ProtocolResult<()>;

    /// Load the pair persisted under `relation`, or `None` if there is none.
    fn load_keys(&self, relation: &RelationHash) -> ProtocolResult<Option<KeyPair>>;
}

// ---------------------------------------------------------------------------
// MemoryKeyStore
// ---------------------------------------------------------------------------

/// Key store backed by a `HashMap` of encoded pairs.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<RelationHash, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted pairs.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn save_keys(&self, relation: &RelationHash, keys: &KeyPair) -> ProtocolResult<()> {
        let bytes = keys.to_bytes()?;
        self.entries.write().insert(*relation, bytes);
        Ok(())
    }

    fn load_keys(&self, relation: &RelationHash) -> ProtocolResult<Option<KeyPair>> {
        let entries = self.entries.read();
        entries
            .get(relation)
            .map(|bytes| KeyPair::from_bytes(bytes))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// SledKeyStore
// ---------------------------------------------------------------------------

/// Key store persisted in an embedded sled database.
///
/// sled is thread-safe, so the store can be shared via `Arc` without extra
/// locking.
#[derive(Debug, Clone)]
pub struct SledKeyStore {
    db: Db,
    key_pairs: Tree,
}

impl SledKeyStore {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> ProtocolResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Temporary database removed on drop. For tests.
    pub fn open_temporary() -> ProtocolResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> ProtocolResult<Self> {
        let key_pairs = db.open_tree(KEY_PAIR_TREE)?;
        Ok(Self { db, key_pairs })
    }

    /// Whether a pair is persisted under `relation`.
    pub fn contains(&self, relation: &RelationHash) -> ProtocolResult<bool> {
        Ok(self.key_pairs.contains_key(relation.as_bytes())?)
    }
}

impl KeyStore for SledKeyStore {
    fn save_keys(&self, relation: &RelationHash, keys: &KeyPair) -> ProtocolResult<()> {
        let bytes = keys.to_bytes()?;
        self.key_pairs.insert(relation.as_bytes(), bytes)?;
        // Keys must be on disk before any proof made with them leaves the node.
        self.db.flush()?;
        Ok(())
    }

    fn load_keys(&self, relation: &RelationHash) -> ProtocolResult<Option<KeyPair>> {
        match self.key_pairs.get(relation.as_bytes())? {
            Some(bytes) => KeyPair::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

//! Concurrent identity → balance map.
//!
//! ## Design
//!
//! - `DashMap` shards the keyspace, so writers for different identities
//!   rarely contend and never block readers of other shards.
//! - Every operation on one identity goes through that identity's shard lock,
//!   which serializes same-identity calls: a `get` issued after a `put`
//!   returns observes the new value.
//! - Last write wins. There is no eviction.
//!
//! Balances are stored as received. Range validation happens when a witness
//! is built, so an out-of-range balance can be stored but never proved.

use std::fmt;

use dashmap::DashMap;

use crate::error::{ProtocolError, ProtocolResult};

/// Thread-safe map from identity to private balance.
#[derive(Default)]
pub struct BalanceStore {
    balances: DashMap<String, i64>,
}

impl fmt::Debug for BalanceStore {
    // Balances are private; only the entry count is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceStore")
            .field("identities", &self.balances.len())
            .finish()
    }
}

impl BalanceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or overwrites the balance for `identity`. Always succeeds.
    pub fn put(&self, identity: &str, balance: i64) {
        self.balances.insert(identity.to_owned(), balance);
    }

    /// Returns the current balance for `identity`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::NotFound`] if the identity was never stored.
    pub fn get(&self, identity: &str) -> ProtocolResult<i64> {
        self.balances
            .get(identity)
            .map(|entry| *entry.value())
            .ok_or_else(|| ProtocolError::NotFound(identity.to_owned()))
    }

    /// Whether a balance exists for `identity`.
    pub fn contains(&self, identity: &str) -> bool {
        self.balances.contains_key(identity)
    }

    /// Number of identities with a stored balance.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Whether the store holds no balances.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

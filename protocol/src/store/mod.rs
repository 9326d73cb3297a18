//! # Balance Storage
//!
//! In-memory, process-local storage of private balances keyed by identity.
//! Nothing here survives a restart; durable storage of user records is the
//! business of whatever sits in front of the node.

pub mod balances;

pub use balances::BalanceStore;

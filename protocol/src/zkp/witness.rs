//! Per-request witness for the threshold relation.
//!
//! A [`Witness`] pairs the private balance with the public threshold after
//! both have been range-checked. It lives only for the duration of one prove
//! call, is never persisted, and its `Debug` output redacts the balance.

use std::fmt;

use ark_bn254::Fr;

use crate::config::{MAX_VALUE, MIN_VALUE};
use crate::error::{ProtocolError, ProtocolResult};

use super::relation;

/// Validated (balance, threshold) pair in the shape the relation expects.
#[derive(Clone, PartialEq, Eq)]
pub struct Witness {
    /// Private.
    balance: u64,
    /// Public.
    threshold: u64,
}

impl Witness {
    /// Range-check both values and build the witness.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidWitness`] if either value is negative.
    pub fn new(balance: i64, threshold: i64) -> ProtocolResult<Self> {
        Ok(Self {
            balance: validate_value("balance", balance)?,
            threshold: validate_value("threshold", threshold)?,
        })
    }

    /// The public threshold.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// The private balance. Crate-internal so it cannot leak through the API.
    pub(crate) fn balance(&self) -> u64 {
        self.balance
    }

    /// Evaluate `threshold <= balance` natively.
    pub fn is_satisfied(&self) -> bool {
        self.threshold <= self.balance
    }

    /// Public inputs this witness binds a proof to.
    pub fn public_inputs(&self) -> Vec<Fr> {
        relation::public_inputs(self.threshold)
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("balance", &"<redacted>")
            .field("threshold", &self.threshold)
            .finish()
    }
}

/// Map a public threshold into the relation's value domain.
///
/// # Errors
///
/// [`ProtocolError::InvalidWitness`] if `threshold` is negative.
pub fn validate_threshold(threshold: i64) -> ProtocolResult<u64> {
    validate_value("threshold", threshold)
}

fn validate_value(name: &str, value: i64) -> ProtocolResult<u64> {
    if !(MIN_VALUE..=MAX_VALUE).contains(&value) {
        return Err(ProtocolError::InvalidWitness(format!(
            "{} {} is outside [{}, {}]",
            name, value, MIN_VALUE, MAX_VALUE
        )));
    }
    u64::try_from(value)
        .map_err(|_| ProtocolError::InvalidWitness(format!("{} {} is negative", name, value)))
}

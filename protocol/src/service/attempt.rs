//! Per-attempt lifecycle tracking.
//!
//! ```text
//!   Stored ──► ProofRequested ──► ProofIssued ──► VerifyRequested ──► Verified
//!                    │                                   │
//!                    └──────────► Rejected ◄─────────────┘
//! ```
//!
//! An attempt exists only for the duration of one service call. The prove
//! half and the verify half are independent calls; the verify half starts
//! from `ProofIssued` because the caller, not the service, holds the proof.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};

/// States of a single identity-threshold attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// The identity has a balance in the store.
    Stored,
    /// A prove call is in progress.
    ProofRequested,
    /// A proof was returned to the caller.
    ProofIssued,
    /// A verify call is in progress.
    VerifyRequested,
    /// The proof verified for the threshold.
    Verified,
    /// The balance was below the threshold, or the proof did not verify.
    Rejected,
}

impl AttemptState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: AttemptState) -> bool {
        use AttemptState::*;
        matches!(
            (self, next),
            (Stored, ProofRequested)
                | (ProofRequested, ProofIssued)
                | (ProofRequested, Rejected)
                | (ProofIssued, VerifyRequested)
                | (VerifyRequested, Verified)
                | (VerifyRequested, Rejected)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Verified | AttemptState::Rejected)
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks one attempt through its states.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Identity the attempt proves for. `None` on the verify half, which
    /// never learns who produced the proof.
    identity: Option<String>,
    threshold: i64,
    state: AttemptState,
}

impl Attempt {
    /// Prove half: begins once the identity's balance has been found.
    pub fn stored(identity: &str, threshold: i64) -> Self {
        Self {
            identity: Some(identity.to_owned()),
            threshold,
            state: AttemptState::Stored,
        }
    }

    /// Verify half: begins with a proof already in the caller's hands.
    pub fn issued(threshold: i64) -> Self {
        Self {
            identity: None,
            threshold,
            state: AttemptState::ProofIssued,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidTransition`] if the transition is illegal.
    /// The attempt stays in its current state.
    pub fn advance(&mut self, next: AttemptState) -> ProtocolResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ProtocolError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(
            identity = self.identity.as_deref().unwrap_or("-"),
            threshold = self.threshold,
            from = %self.state,
            to = %next,
            "attempt transition"
        );
        self.state = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

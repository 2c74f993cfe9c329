//! Depositor-side note helpers.
//!
//! The pool itself never decomposes a commitment; these helpers exist for
//! depositors, coordinators, and tests to build the opaque values the pool
//! stores and adjudicates.
//!
//! Off-system representation:
//!   commitment = keccak256(amount_be_8bytes || blinding || nullifier)
//!   hash_lock  = keccak256(secret)

use crate::hash::keccak256;
use serde::{Deserialize, Serialize};

/// A shielded escrow note held by a depositor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Deposited token amount.
    pub amount: u64,
    /// Random blinding factor hiding the deposit.
    pub blinding: [u8; 32],
    /// One-time-use nullifier, revealed only at withdrawal.
    pub nullifier: [u8; 32],
}

impl Note {
    /// Compute the note commitment.
    ///
    /// commitment = keccak256(amount_be_8bytes || blinding_32bytes || nullifier_32bytes)
    /// Total preimage: 72 bytes.
    pub fn commitment(&self) -> [u8; 32] {
        let mut preimage = [0u8; 72];
        preimage[0..8].copy_from_slice(&self.amount.to_be_bytes());
        preimage[8..40].copy_from_slice(&self.blinding);
        preimage[40..72].copy_from_slice(&self.nullifier);
        keccak256(&preimage)
    }
}

/// Derive the HTLC hash-lock from a redemption secret.
pub fn hash_lock(secret: &[u8; 32]) -> [u8; 32] {
    keccak256(secret)
}

//! Grow-only registry of consumed nullifiers.
//!
//! A nullifier is the sole link between a deposit's proof of ownership and
//! its withdrawal. Once marked spent it never resets; the registry only
//! grows.

use std::collections::HashSet;

/// Write-once spent set preventing any nullifier from being consumed twice.
#[derive(Debug, Default, Clone)]
pub struct NullifierRegistry {
    spent: HashSet<[u8; 32]>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the nullifier has been consumed.
    pub fn is_spent(&self, nullifier: &[u8; 32]) -> bool {
        self.spent.contains(nullifier)
    }

    /// Consume a nullifier. Called by the withdrawal path after all
    /// validation succeeds and before the external custody transfer.
    pub(crate) fn mark_spent(&mut self, nullifier: [u8; 32]) {
        self.spent.insert(nullifier);
    }

    /// Unwind a consumption within the same call, after the custody transfer
    /// was refused. Never reachable once a withdrawal has completed.
    pub(crate) fn unmark(&mut self, nullifier: &[u8; 32]) {
        self.spent.remove(nullifier);
    }

    /// Number of consumed nullifiers.
    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}

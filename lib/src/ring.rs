//! Bounded history of accepted Merkle roots.
//!
//! Coordinators republish the off-chain tree's root periodically; proofs
//! generated against the previous root are often still in flight when the
//! root changes. The ring keeps a fixed window of previously accepted roots
//! so those proofs stay valid, trading unbounded history for O(1) membership
//! checks.

use crate::error::PoolError;
use std::collections::HashMap;

/// Number of roots the window retains, current root included.
pub const ROOT_HISTORY_SIZE: usize = 100;

const ZERO_ROOT: [u8; 32] = [0u8; 32];

/// Fixed-capacity circular buffer of accepted roots plus an
/// occurrence-counted membership map.
///
/// Membership is reference-counted rather than set-based so that the same
/// root value accepted twice stays known until every slot holding it has
/// been evicted.
#[derive(Debug, Clone)]
pub struct RootHistoryRing {
    /// Previously accepted roots; the zero value marks a vacant slot.
    slots: Vec<[u8; 32]>,
    write_index: usize,
    current: Option<[u8; 32]>,
    /// root -> live references (occupied slots holding it, plus one if it
    /// is the current root).
    known: HashMap<[u8; 32], u32>,
}

impl Default for RootHistoryRing {
    fn default() -> Self {
        Self::new()
    }
}

impl RootHistoryRing {
    pub fn new() -> Self {
        RootHistoryRing {
            slots: vec![ZERO_ROOT; ROOT_HISTORY_SIZE],
            write_index: 0,
            current: None,
            known: HashMap::new(),
        }
    }

    /// Accept a new current root, retiring the previous one into the ring.
    ///
    /// The slot the write index lands on next is vacated eagerly, so the
    /// window holds exactly the last `ROOT_HISTORY_SIZE` accepted roots: the
    /// oldest becomes unknown on the 101st acceptance.
    pub fn advance(&mut self, new_root: [u8; 32]) -> Result<(), PoolError> {
        if new_root == ZERO_ROOT {
            return Err(PoolError::ZeroRoot);
        }

        if let Some(prev) = self.current.replace(new_root) {
            // prev's reference moves from the current pointer to its slot.
            self.slots[self.write_index] = prev;
            self.write_index = (self.write_index + 1) % ROOT_HISTORY_SIZE;

            let evicted = std::mem::replace(&mut self.slots[self.write_index], ZERO_ROOT);
            if evicted != ZERO_ROOT {
                self.release(evicted);
            }
        }

        self.retain(new_root);
        Ok(())
    }

    /// True iff `root` is the current root or still resides in the window.
    pub fn is_known(&self, root: &[u8; 32]) -> bool {
        *root != ZERO_ROOT && self.known.contains_key(root)
    }

    /// The most recently accepted root, if any.
    pub fn current_root(&self) -> Option<[u8; 32]> {
        self.current
    }

    fn retain(&mut self, root: [u8; 32]) {
        *self.known.entry(root).or_insert(0) += 1;
    }

    fn release(&mut self, root: [u8; 32]) {
        if let Some(count) = self.known.get_mut(&root) {
            *count -= 1;
            if *count == 0 {
                self.known.remove(&root);
            }
        }
    }
}

//! Off-system incremental Merkle tree builder.
//!
//! Tree maintenance is not the pool's job: the engine publishes
//! `(commitment, leaf_index)` pairs and adjudicates inclusion proofs against
//! roots the owner advances. This builder is what the coordinator runs to
//! consume those pairs, produce the roots fed to `advance_root`, and generate
//! the proofs passed to `create_htlc`.

use crate::hash::{hash_pair, keccak256, MerkleProofStep};

/// Compute the zero values for each level of the Merkle tree.
///   zeros[0] = keccak256(32 zero bytes)
///   zeros[i] = hash_pair(zeros[i-1], zeros[i-1])
pub fn compute_zeros(levels: usize) -> Vec<[u8; 32]> {
    let mut zeros = vec![[0u8; 32]; levels];
    zeros[0] = keccak256(&[0u8; 32]);
    for i in 1..levels {
        zeros[i] = hash_pair(&zeros[i - 1], &zeros[i - 1]);
    }
    zeros
}

/// Compute the root of an empty tree with the given number of levels.
pub fn compute_empty_root(levels: usize) -> [u8; 32] {
    let zeros = compute_zeros(levels);
    hash_pair(&zeros[levels - 1], &zeros[levels - 1])
}

/// An append-only incremental Merkle tree over deposit commitments.
#[derive(Clone, Debug)]
pub struct IncrementalMerkleTree {
    pub levels: usize,
    zeros: Vec<[u8; 32]>,
    filled_subtrees: Vec<[u8; 32]>,
    next_index: u32,
    root: [u8; 32],
    /// All inserted leaves in order.
    leaves: Vec<[u8; 32]>,
}

impl IncrementalMerkleTree {
    /// Create a new empty tree.
    pub fn new(levels: usize) -> Self {
        let zeros = compute_zeros(levels);
        let filled_subtrees = zeros.clone();
        let root = hash_pair(&zeros[levels - 1], &zeros[levels - 1]);

        IncrementalMerkleTree {
            levels,
            zeros,
            filled_subtrees,
            next_index: 0,
            root,
            leaves: Vec::new(),
        }
    }

    /// Insert a leaf into the tree. Returns the leaf index.
    pub fn insert(&mut self, leaf: [u8; 32]) -> u32 {
        let index = self.next_index;
        assert!(
            (index as u64) < (1u64 << self.levels),
            "Merkle tree is full"
        );

        let mut current_index = index;
        let mut current_hash = leaf;

        for i in 0..self.levels {
            if current_index % 2 == 0 {
                // Left child: pair with zero on the right.
                let left = current_hash;
                let right = self.zeros[i];
                self.filled_subtrees[i] = current_hash;
                current_hash = hash_pair(&left, &right);
            } else {
                // Right child: pair with filled subtree on the left.
                let left = self.filled_subtrees[i];
                let right = current_hash;
                current_hash = hash_pair(&left, &right);
            }
            current_index /= 2;
        }

        self.root = current_hash;
        self.next_index = index + 1;
        self.leaves.push(leaf);

        index
    }

    /// The root after the most recent insertion.
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// Number of inserted leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Generate a Merkle proof for the leaf at the given index.
    ///
    /// Rebuilds the tree level by level to collect sibling hashes. Fine for
    /// coordinator-side use; a high-volume deployment would cache levels.
    pub fn proof(&self, leaf_index: u32) -> Vec<MerkleProofStep> {
        assert!(
            (leaf_index as usize) < self.leaves.len(),
            "leaf index out of range"
        );

        let num_leaves = 1usize << self.levels;
        let mut current_level: Vec<[u8; 32]> = Vec::with_capacity(num_leaves);

        // Fill in inserted leaves, pad the rest with zeros[0].
        for i in 0..num_leaves {
            if i < self.leaves.len() {
                current_level.push(self.leaves[i]);
            } else {
                current_level.push(self.zeros[0]);
            }
        }

        let mut proof = Vec::with_capacity(self.levels);
        let mut idx = leaf_index as usize;

        for _level in 0..self.levels {
            let sibling_idx = idx ^ 1;
            let sibling = current_level[sibling_idx];
            let is_left = idx % 2 == 0;

            proof.push(MerkleProofStep { is_left, sibling });

            let next_len = current_level.len() / 2;
            let mut next_level = Vec::with_capacity(next_len);
            for j in 0..next_len {
                next_level.push(hash_pair(&current_level[2 * j], &current_level[2 * j + 1]));
            }
            current_level = next_level;
            idx /= 2;
        }

        proof
    }
}

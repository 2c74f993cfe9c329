//! Keccak-256 primitives and Merkle inclusion verification.

use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

/// Compute keccak256 hash.
/// Note: tiny_keccak::Keccak is the original Keccak-256 (NOT SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Hash a pair of 32-byte nodes: keccak256 of the 64 bytes (left ++ right).
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left);
    data[32..].copy_from_slice(right);
    keccak256(&data)
}

/// A single step in a Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofStep {
    /// true if the current node is the LEFT child (index even at this level).
    /// When is_left=true:  parent = hash(current, sibling)
    /// When is_left=false: parent = hash(sibling, current)
    pub is_left: bool,
    /// The sibling hash at this level.
    pub sibling: [u8; 32],
}

/// Verify a Merkle proof against an expected root.
///
/// Traverses from the leaf up to the root, hashing at each level according
/// to the `is_left` flag. An empty proof verifies iff `leaf == expected_root`
/// (single-leaf degenerate tree), which is deliberate, not an error.
pub fn verify_merkle_proof(
    leaf: [u8; 32],
    proof: &[MerkleProofStep],
    expected_root: [u8; 32],
) -> bool {
    let mut current = leaf;
    for step in proof {
        if step.is_left {
            current = hash_pair(&current, &step.sibling);
        } else {
            current = hash_pair(&step.sibling, &current);
        }
    }
    current == expected_root
}

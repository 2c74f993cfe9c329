//! Shielded escrow pool with hash-time-locked conditional withdrawals.
//!
//! Settlement layer for a cross-ledger atomic-swap bridge:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     SHIELDED ESCROW POOL                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  depositor                                                   │
//! │  └─ deposit(token, commitment, amount)                       │
//! │       commitment = keccak256(amount || blinding || nullifier)│
//! │                                                              │
//! │  coordinator (owner)                                         │
//! │  ├─ advance_root(root)        republish off-chain tree root  │
//! │  ├─ create_htlc(..)           lock a proven commitment       │
//! │  └─ withdraw(.., secret?)     redeem before / refund after   │
//! │                                                              │
//! │  state                                                       │
//! │  ├─ root history ring (100 most recent accepted roots)       │
//! │  ├─ nullifier registry (grow-only spent set)                 │
//! │  └─ virtual HTLC ledger (Active → Redeemed | Refunded)       │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pool never maintains the commitment tree itself: deposits publish
//! `(commitment, leaf_index)` pairs for an off-system tree builder
//! ([`IncrementalMerkleTree`]), and inclusion is adjudicated purely by
//! Merkle proof against a root the owner previously advanced.

pub mod engine;
pub mod error;
pub mod hash;
pub mod htlc;
pub mod ledger;
pub mod note;
pub mod nullifier;
pub mod ring;
pub mod tree;

pub use engine::{
    DepositRecord, HtlcCreated, HtlcParams, PoolConfig, ShieldedPool, WithdrawKind,
    WithdrawalRecord,
};
pub use error::PoolError;
pub use hash::{hash_pair, keccak256, verify_merkle_proof, MerkleProofStep};
pub use htlc::{HtlcLedger, HtlcState, VirtualHtlc};
pub use ledger::{InMemoryLedger, TokenLedger};
pub use note::{hash_lock, Note};
pub use nullifier::NullifierRegistry;
pub use ring::{RootHistoryRing, ROOT_HISTORY_SIZE};
pub use tree::IncrementalMerkleTree;

/// Ledger account identifier (token contracts, depositors, recipients).
pub type Address = [u8; 20];

/// The null account. Never a valid token, recipient, or owner.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// Minimum distance between `now` and an HTLC timelock (1 hour, exclusive).
pub const MIN_TIMELOCK_DELAY: u64 = 3_600;

/// Maximum distance between `now` and an HTLC timelock (7 days, exclusive).
pub const MAX_TIMELOCK_DELAY: u64 = 604_800;

/// Per-deposit ceiling enforced by the bounded pool variant.
pub const DEFAULT_DEPOSIT_CAP: u64 = 10_000;

//! Pool rejection reasons.
//!
//! Every failure is a synchronous, named rejection: nothing is retried,
//! clamped, or coerced, and a rejection leaves no partial state behind.

use thiserror::Error;

/// Errors produced by pool validation or state transitions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    // --- authorization ---
    /// Caller is not the pool owner.
    #[error("caller is not the pool owner")]
    NotOwner,

    /// A nested call arrived while another operation was in flight.
    #[error("reentrant call rejected")]
    ReentrantCall,

    // --- invalid input ---
    /// Commitment must be a nonzero field element.
    #[error("zero commitment")]
    ZeroCommitment,

    /// Nullifier must be a nonzero field element.
    #[error("zero nullifier")]
    ZeroNullifier,

    /// Hash-lock must be a nonzero field element.
    #[error("zero hash lock")]
    ZeroHashLock,

    /// Merkle root must be a nonzero field element.
    #[error("zero root")]
    ZeroRoot,

    /// Recipient must not be the null address.
    #[error("zero recipient address")]
    ZeroRecipient,

    /// Token must not be the null address.
    #[error("zero token address")]
    ZeroToken,

    /// Amount must be positive.
    #[error("zero amount")]
    ZeroAmount,

    /// Amount exceeds the bounded pool's per-deposit ceiling.
    #[error("amount exceeds the deposit cap")]
    DepositCapExceeded,

    /// Timelock must land strictly inside (now + 1h, now + 7d).
    #[error("timelock outside the allowed window")]
    TimelockOutOfRange,

    // --- state conflict ---
    /// Token is not in the supported set.
    #[error("token is not supported")]
    TokenNotSupported,

    /// Token is already in the supported set.
    #[error("token is already supported")]
    TokenAlreadySupported,

    /// Nullifier has already been consumed.
    #[error("nullifier already spent")]
    NullifierSpent,

    /// An HTLC already exists for this nullifier.
    #[error("HTLC already exists for nullifier")]
    HtlcExists,

    /// No HTLC was ever created for this nullifier.
    #[error("no HTLC for nullifier")]
    HtlcNotFound,

    /// The HTLC has already been redeemed or refunded.
    #[error("HTLC is not active")]
    HtlcInactive,

    /// The HTLC is bound to a different token.
    #[error("token does not match the HTLC record")]
    TokenMismatch,

    // --- proof verification ---
    /// Root is neither current nor in the history ring.
    #[error("unknown Merkle root")]
    UnknownRoot,

    /// Merkle inclusion proof did not reproduce the root.
    #[error("invalid inclusion proof")]
    InvalidProof,

    /// keccak256(secret) does not match the HTLC hash-lock.
    #[error("wrong redemption secret")]
    WrongSecret,

    /// Redemption attempted at or after the timelock.
    #[error("timelock has expired")]
    TimelockExpired,

    /// Refund attempted before the timelock.
    #[error("timelock has not been reached")]
    TimelockNotReached,

    // --- custody ---
    /// Custody holds less than the requested amount.
    #[error("insufficient custody balance")]
    InsufficientBalance,

    /// The token ledger refused the transfer.
    #[error("token transfer failed")]
    TransferFailed,
}

//! Shielded pool engine.
//!
//! Orchestrates deposit, HTLC creation, and unified withdrawal over the
//! three state stores (root history ring, nullifier registry, virtual HTLC
//! ledger) and the external token ledger. Every public entry point is a
//! single atomic unit of work: a scoped reentrancy guard rejects nested
//! calls, validation precedes any state write, and a rejection leaves no
//! partial mutation behind.

use crate::error::PoolError;
use crate::hash::{keccak256, verify_merkle_proof, MerkleProofStep};
use crate::htlc::{HtlcLedger, HtlcState, VirtualHtlc};
use crate::ledger::TokenLedger;
use crate::nullifier::NullifierRegistry;
use crate::ring::RootHistoryRing;
use crate::{Address, DEFAULT_DEPOSIT_CAP, MAX_TIMELOCK_DELAY, MIN_TIMELOCK_DELAY, ZERO_ADDRESS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Pool-variant parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Per-deposit ceiling. `Some(cap)` is the bounded variant; `None`
    /// accepts any positive amount.
    pub deposit_cap: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::bounded(DEFAULT_DEPOSIT_CAP)
    }
}

impl PoolConfig {
    pub fn bounded(cap: u64) -> Self {
        PoolConfig {
            deposit_cap: Some(cap),
        }
    }

    pub fn unbounded() -> Self {
        PoolConfig { deposit_cap: None }
    }
}

/// Emitted on every accepted deposit; consumed by the off-system tree
/// builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub commitment: [u8; 32],
    pub leaf_index: u64,
    pub timestamp: u64,
}

/// Emitted when the owner locks a proven commitment behind an HTLC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcCreated {
    pub nullifier: [u8; 32],
    pub token: Address,
    pub root: [u8; 32],
    pub hash_lock: [u8; 32],
    pub timelock: u64,
    pub amount: u64,
}

/// Which withdrawal branch settled the HTLC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawKind {
    /// Secret supplied before the timelock.
    Redemption,
    /// Timelock reached with no secret.
    Refund,
}

/// Emitted on every completed withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub nullifier: [u8; 32],
    pub token: Address,
    pub recipient: Address,
    pub amount: u64,
    pub kind: WithdrawKind,
    pub timestamp: u64,
}

/// Creation parameters for [`ShieldedPool::create_htlc`].
#[derive(Clone, Copy, Debug)]
pub struct HtlcParams<'a> {
    pub token: Address,
    pub nullifier: [u8; 32],
    /// Root the inclusion proof was generated against; must still be in the
    /// history window.
    pub root: [u8; 32],
    pub commitment: [u8; 32],
    pub amount: u64,
    pub proof: &'a [MerkleProofStep],
    pub hash_lock: [u8; 32],
    /// Unix time (seconds) at which refund becomes possible.
    pub timelock: u64,
}

/// Scoped flag covering the window between an external custody call and the
/// completion of internal bookkeeping. Acquired at entry, released on Drop
/// on every exit path.
struct ReentrancyGuard {
    flag: Arc<AtomicBool>,
}

impl ReentrancyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, PoolError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(PoolError::ReentrantCall);
        }
        Ok(ReentrancyGuard {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The shielded escrow pool.
///
/// `L` is the external token ledger holding custody of deposited funds.
/// All administrative operations are gated on the single `owner` identity;
/// ownership transfer lives outside this core.
pub struct ShieldedPool<L: TokenLedger> {
    owner: Address,
    /// Custody account on the token ledger.
    custody: Address,
    config: PoolConfig,
    ledger: L,
    supported_tokens: HashSet<Address>,
    roots: RootHistoryRing,
    nullifiers: NullifierRegistry,
    htlcs: HtlcLedger,
    next_leaf_index: u64,
    entered: Arc<AtomicBool>,
}

impl<L: TokenLedger> ShieldedPool<L> {
    pub fn new(owner: Address, custody: Address, config: PoolConfig, ledger: L) -> Self {
        ShieldedPool {
            owner,
            custody,
            config,
            ledger,
            supported_tokens: HashSet::new(),
            roots: RootHistoryRing::new(),
            nullifiers: NullifierRegistry::new(),
            htlcs: HtlcLedger::new(),
            next_leaf_index: 0,
            entered: Arc::new(AtomicBool::new(false)),
        }
    }

    fn assert_owner(&self, caller: Address) -> Result<(), PoolError> {
        if caller != self.owner {
            return Err(PoolError::NotOwner);
        }
        Ok(())
    }

    fn check_amount(&self, amount: u64) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if let Some(cap) = self.config.deposit_cap {
            if amount > cap {
                return Err(PoolError::DepositCapExceeded);
            }
        }
        Ok(())
    }

    // --- public operations ---

    /// Place `amount` of `token` behind an opaque `commitment`.
    ///
    /// Pulls the funds from `caller` into custody and publishes the
    /// commitment with its assigned leaf index for the off-system tree
    /// builder. No tree is updated in here.
    pub fn deposit(
        &mut self,
        caller: Address,
        token: Address,
        commitment: [u8; 32],
        amount: u64,
        now: u64,
    ) -> Result<DepositRecord, PoolError> {
        let _guard = ReentrancyGuard::acquire(&self.entered)?;
        if !self.supported_tokens.contains(&token) {
            return Err(PoolError::TokenNotSupported);
        }
        if commitment == [0u8; 32] {
            return Err(PoolError::ZeroCommitment);
        }
        self.check_amount(amount)?;

        if !self.ledger.transfer(token, Some(caller), self.custody, amount) {
            return Err(PoolError::TransferFailed);
        }

        let leaf_index = self.next_leaf_index;
        self.next_leaf_index += 1;

        info!(
            leaf_index,
            commitment = %hex::encode(commitment),
            amount,
            "deposit accepted"
        );
        Ok(DepositRecord {
            commitment,
            leaf_index,
            timestamp: now,
        })
    }

    /// Accept a newly republished Merkle root. Owner only.
    pub fn advance_root(&mut self, caller: Address, new_root: [u8; 32]) -> Result<(), PoolError> {
        let _guard = ReentrancyGuard::acquire(&self.entered)?;
        self.assert_owner(caller)?;
        self.roots.advance(new_root)?;
        info!(root = %hex::encode(new_root), "root advanced");
        Ok(())
    }

    /// Lock a proven-included commitment behind a hash-time-locked escrow.
    /// Owner only.
    pub fn create_htlc(
        &mut self,
        caller: Address,
        params: HtlcParams<'_>,
        now: u64,
    ) -> Result<HtlcCreated, PoolError> {
        let _guard = ReentrancyGuard::acquire(&self.entered)?;
        self.assert_owner(caller)?;
        if !self.supported_tokens.contains(&params.token) {
            return Err(PoolError::TokenNotSupported);
        }
        if params.nullifier == [0u8; 32] {
            return Err(PoolError::ZeroNullifier);
        }
        if params.commitment == [0u8; 32] {
            return Err(PoolError::ZeroCommitment);
        }
        if params.hash_lock == [0u8; 32] {
            return Err(PoolError::ZeroHashLock);
        }
        self.check_amount(params.amount)?;
        if self.nullifiers.is_spent(&params.nullifier) {
            return Err(PoolError::NullifierSpent);
        }
        if !self.roots.is_known(&params.root) {
            return Err(PoolError::UnknownRoot);
        }
        if !verify_merkle_proof(params.commitment, params.proof, params.root) {
            return Err(PoolError::InvalidProof);
        }
        // Reachable no sooner than 1 hour and no later than 7 days out,
        // both bounds exclusive.
        if params.timelock <= now + MIN_TIMELOCK_DELAY
            || params.timelock >= now + MAX_TIMELOCK_DELAY
        {
            return Err(PoolError::TimelockOutOfRange);
        }

        self.htlcs.create(
            params.nullifier,
            VirtualHtlc {
                root: params.root,
                token: params.token,
                hash_lock: params.hash_lock,
                timelock: params.timelock,
                amount: params.amount,
                state: HtlcState::Active,
            },
        )?;

        info!(
            nullifier = %hex::encode(params.nullifier),
            timelock = params.timelock,
            amount = params.amount,
            "HTLC created"
        );
        Ok(HtlcCreated {
            nullifier: params.nullifier,
            token: params.token,
            root: params.root,
            hash_lock: params.hash_lock,
            timelock: params.timelock,
            amount: params.amount,
        })
    }

    /// Unified redemption/refund entry point. Owner only.
    ///
    /// With a secret: redeems iff `now` precedes the timelock and
    /// `keccak256(secret)` matches the hash-lock. Without one: refunds iff
    /// the timelock has been reached. Either branch consumes the nullifier
    /// strictly before the external custody transfer.
    pub fn withdraw(
        &mut self,
        caller: Address,
        token: Address,
        nullifier: [u8; 32],
        recipient: Address,
        secret: Option<[u8; 32]>,
        now: u64,
    ) -> Result<WithdrawalRecord, PoolError> {
        let _guard = ReentrancyGuard::acquire(&self.entered)?;
        self.assert_owner(caller)?;
        if !self.supported_tokens.contains(&token) {
            return Err(PoolError::TokenNotSupported);
        }
        if nullifier == [0u8; 32] {
            return Err(PoolError::ZeroNullifier);
        }
        if recipient == ZERO_ADDRESS {
            return Err(PoolError::ZeroRecipient);
        }
        if self.nullifiers.is_spent(&nullifier) {
            return Err(PoolError::NullifierSpent);
        }

        let record = *self.htlcs.get(&nullifier).ok_or(PoolError::HtlcNotFound)?;
        if record.state != HtlcState::Active {
            return Err(PoolError::HtlcInactive);
        }
        if record.token != token {
            return Err(PoolError::TokenMismatch);
        }

        let kind = match secret {
            Some(secret) => {
                if now >= record.timelock {
                    return Err(PoolError::TimelockExpired);
                }
                if keccak256(&secret) != record.hash_lock {
                    return Err(PoolError::WrongSecret);
                }
                WithdrawKind::Redemption
            }
            None => {
                if now < record.timelock {
                    return Err(PoolError::TimelockNotReached);
                }
                WithdrawKind::Refund
            }
        };
        let new_state = match kind {
            WithdrawKind::Redemption => HtlcState::Redeemed,
            WithdrawKind::Refund => HtlcState::Refunded,
        };

        // Consume the nullifier and settle the record before touching the
        // external ledger, closing the reentrancy window.
        self.htlcs.transition(&nullifier, new_state)?;
        self.nullifiers.mark_spent(nullifier);

        if !self.ledger.transfer(token, None, recipient, record.amount) {
            // A refused custody transfer unwinds the call entirely.
            self.nullifiers.unmark(&nullifier);
            self.htlcs.reopen(&nullifier);
            return Err(PoolError::TransferFailed);
        }

        info!(
            nullifier = %hex::encode(nullifier),
            recipient = %hex::encode(recipient),
            amount = record.amount,
            kind = ?kind,
            "withdrawal settled"
        );
        Ok(WithdrawalRecord {
            nullifier,
            token,
            recipient,
            amount: record.amount,
            kind,
            timestamp: now,
        })
    }

    // --- administrative operations ---

    /// Make `token` eligible for deposits and HTLCs. Owner only; adding an
    /// already-supported token fails.
    pub fn add_supported_token(
        &mut self,
        caller: Address,
        token: Address,
    ) -> Result<(), PoolError> {
        let _guard = ReentrancyGuard::acquire(&self.entered)?;
        self.assert_owner(caller)?;
        if token == ZERO_ADDRESS {
            return Err(PoolError::ZeroToken);
        }
        if !self.supported_tokens.insert(token) {
            return Err(PoolError::TokenAlreadySupported);
        }
        info!(token = %hex::encode(token), "token supported");
        Ok(())
    }

    /// Remove `token` from the supported set. Owner only; removing an
    /// unsupported token fails.
    pub fn remove_supported_token(
        &mut self,
        caller: Address,
        token: Address,
    ) -> Result<(), PoolError> {
        let _guard = ReentrancyGuard::acquire(&self.entered)?;
        self.assert_owner(caller)?;
        if !self.supported_tokens.remove(&token) {
            return Err(PoolError::TokenNotSupported);
        }
        info!(token = %hex::encode(token), "token support removed");
        Ok(())
    }

    /// Owner rescue path. Bypasses the HTLC and nullifier machinery and
    /// pays straight out of custody.
    pub fn emergency_withdraw(
        &mut self,
        caller: Address,
        token: Address,
        to: Address,
        amount: u64,
    ) -> Result<(), PoolError> {
        let _guard = ReentrancyGuard::acquire(&self.entered)?;
        self.assert_owner(caller)?;
        if to == ZERO_ADDRESS {
            return Err(PoolError::ZeroRecipient);
        }
        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        if self.ledger.balance_of(token, self.custody) < amount {
            return Err(PoolError::InsufficientBalance);
        }
        if !self.ledger.transfer(token, None, to, amount) {
            return Err(PoolError::TransferFailed);
        }
        info!(token = %hex::encode(token), to = %hex::encode(to), amount, "emergency withdrawal");
        Ok(())
    }

    // --- views ---

    pub fn is_token_supported(&self, token: &Address) -> bool {
        self.supported_tokens.contains(token)
    }

    pub fn is_nullifier_spent(&self, nullifier: &[u8; 32]) -> bool {
        self.nullifiers.is_spent(nullifier)
    }

    pub fn is_known_root(&self, root: &[u8; 32]) -> bool {
        self.roots.is_known(root)
    }

    pub fn get_current_root(&self) -> Option<[u8; 32]> {
        self.roots.current_root()
    }

    pub fn get_next_leaf_index(&self) -> u64 {
        self.next_leaf_index
    }

    pub fn get_htlc(&self, nullifier: &[u8; 32]) -> Option<&VirtualHtlc> {
        self.htlcs.get(nullifier)
    }

    /// Custody balance held for `token`.
    pub fn get_balance(&self, token: Address) -> u64 {
        self.ledger.balance_of(token, self.custody)
    }
}

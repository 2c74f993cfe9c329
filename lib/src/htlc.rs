//! Virtual HTLC ledger.
//!
//! One escrow record per nullifier: hash-lock, time-lock, bound token and
//! amount, and redemption state. A record is created exactly once and
//! transitions exactly once, to `Redeemed` or `Refunded`; both are terminal.
//!
//! Presence is explicit: a nullifier with no record is a distinct
//! `HtlcNotFound` rejection, never a zero-valued record.

use crate::error::PoolError;
use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Redemption state of a virtual HTLC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HtlcState {
    /// Created, awaiting redemption or refund.
    Active,
    /// Secret supplied before the timelock; funds paid to the recipient.
    Redeemed,
    /// Timelock reached with no secret; funds returned.
    Refunded,
}

/// Per-nullifier escrow record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHtlc {
    /// The known root the creation proof was verified against.
    pub root: [u8; 32],
    /// Token the escrowed amount is denominated in.
    pub token: Address,
    /// keccak256 of the redemption secret.
    pub hash_lock: [u8; 32],
    /// Unix time (seconds) at which refund becomes possible.
    pub timelock: u64,
    /// Escrowed amount.
    pub amount: u64,
    pub state: HtlcState,
}

/// Ledger of virtual HTLCs keyed by nullifier.
#[derive(Debug, Default, Clone)]
pub struct HtlcLedger {
    records: HashMap<[u8; 32], VirtualHtlc>,
}

impl HtlcLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new record for `nullifier`. Rejects a zero hash-lock and any
    /// nullifier that already carries a record, whatever its state.
    pub fn create(&mut self, nullifier: [u8; 32], record: VirtualHtlc) -> Result<(), PoolError> {
        if record.hash_lock == [0u8; 32] {
            return Err(PoolError::ZeroHashLock);
        }
        match self.records.entry(nullifier) {
            Entry::Occupied(_) => Err(PoolError::HtlcExists),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// The record for `nullifier`, if one was ever created.
    pub fn get(&self, nullifier: &[u8; 32]) -> Option<&VirtualHtlc> {
        self.records.get(nullifier)
    }

    /// Move an `Active` record to its terminal state. Invoked once by the
    /// withdrawal path.
    pub(crate) fn transition(
        &mut self,
        nullifier: &[u8; 32],
        new_state: HtlcState,
    ) -> Result<(), PoolError> {
        let record = self
            .records
            .get_mut(nullifier)
            .ok_or(PoolError::HtlcNotFound)?;
        if record.state != HtlcState::Active {
            return Err(PoolError::HtlcInactive);
        }
        record.state = new_state;
        Ok(())
    }

    /// Unwind a transition within the same call, after the custody transfer
    /// was refused. Never reachable once a withdrawal has completed.
    pub(crate) fn reopen(&mut self, nullifier: &[u8; 32]) {
        if let Some(record) = self.records.get_mut(nullifier) {
            record.state = HtlcState::Active;
        }
    }

    /// Number of records ever created.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

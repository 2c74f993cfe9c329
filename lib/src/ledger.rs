//! Token ledger collaborator boundary.
//!
//! The pool treats balance custody as an external black box: it pulls
//! deposits in, pays withdrawals out, and reads its own custody balance.
//! [`InMemoryLedger`] is the reference implementation used by tests.

use crate::Address;
use std::collections::HashMap;

/// Custodial balance transfers for whichever asset the pool escrows.
pub trait TokenLedger {
    /// Move `amount` of `token` from `from` to `to`. A `from` of `None`
    /// draws from the pool's custody account. Returns false on refusal
    /// (insufficient balance, frozen account, ...); the pool treats a
    /// refusal as a transfer failure and aborts the operation.
    fn transfer(&mut self, token: Address, from: Option<Address>, to: Address, amount: u64)
        -> bool;

    /// Balance of `holder` in `token`.
    fn balance_of(&self, token: Address, holder: Address) -> u64;
}

/// Hash-map-backed ledger with a designated custody account.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    custody: Address,
    balances: HashMap<(Address, Address), u64>,
}

impl InMemoryLedger {
    /// `custody` is the account `transfer(from = None, ..)` draws from.
    pub fn new(custody: Address) -> Self {
        InMemoryLedger {
            custody,
            balances: HashMap::new(),
        }
    }

    /// Mint `amount` of `token` to `holder`. Test setup only.
    pub fn credit(&mut self, token: Address, holder: Address, amount: u64) {
        *self.balances.entry((token, holder)).or_insert(0) += amount;
    }
}

impl TokenLedger for InMemoryLedger {
    fn transfer(
        &mut self,
        token: Address,
        from: Option<Address>,
        to: Address,
        amount: u64,
    ) -> bool {
        let from = from.unwrap_or(self.custody);
        let available = self.balance_of(token, from);
        if available < amount {
            return false;
        }
        self.balances.insert((token, from), available - amount);
        *self.balances.entry((token, to)).or_insert(0) += amount;
        true
    }

    fn balance_of(&self, token: Address, holder: Address) -> u64 {
        self.balances.get(&(token, holder)).copied().unwrap_or(0)
    }
}

//! Refund ledger
//!
//! Stake consumed by executed proposals is owed back to the voters. The
//! ledger accumulates what each address is owed until block production
//! drains it into award transactions.

use crate::core::{Amount, Transaction};
use crate::middleware::error::MiddlewareResult;
use num_traits::Zero;
use std::collections::BTreeMap;

/// Pending refunds by address, iterated in address order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefundLedger {
    pending: BTreeMap<String, Amount>,
}

impl RefundLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to what `address` is owed
    pub fn credit(&mut self, address: &str, amount: &Amount) {
        *self
            .pending
            .entry(address.to_string())
            .or_insert_with(Amount::zero) += amount;
    }

    /// Amount owed to `address`
    pub fn pending(&self, address: &str) -> Amount {
        self.pending.get(address).cloned().unwrap_or_default()
    }

    /// Number of addresses with an entry
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing is owed
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Build one award transaction per address owed a positive amount.
    ///
    /// The ledger is only cleared once every transaction has been built;
    /// on error it is left as it was.
    pub fn drain(
        &mut self,
        marker: &[u8],
        block_height: i64,
        timestamp: i64,
    ) -> MiddlewareResult<Vec<Transaction>> {
        let txs = self
            .pending
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(address, amount)| {
                Transaction::award(address, amount, marker, block_height, timestamp)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.pending.clear();
        Ok(txs)
    }
}

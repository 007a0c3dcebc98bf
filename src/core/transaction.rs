//! Award transactions
//!
//! Transactions the node mints itself during block production, such as
//! stake refunds. They have no inputs and a single output.

use crate::core::amount::Amount;
use crate::crypto::sha256;
use chrono::{DateTime, TimeZone, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current transaction version
pub const TX_VERSION: u32 = 2;

/// Default desc tag marking an award transaction
pub const AWARD_MARKER: &[u8] = b"1";

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// Transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Exact decimal amount
    pub amount: String,
    /// Recipient's address
    pub recipient: String,
}

/// A node-generated transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction version
    pub version: u32,
    /// Unique transaction ID (hash of transaction data)
    pub id: String,
    /// Transaction outputs
    pub outputs: Vec<TransactionOutput>,
    /// Block timestamp the transaction was produced for
    pub timestamp: DateTime<Utc>,
    /// Height of the block being produced
    pub block_height: i64,
    /// Whether this is an award (node-minted) transaction
    pub is_award: bool,
    /// Free-form tag, e.g. the award marker
    pub desc: Vec<u8>,
}

impl Transaction {
    /// Create an award transaction paying `amount` to `recipient`.
    ///
    /// `timestamp` is the block timestamp in seconds; nothing here reads
    /// the local clock, so every producer builds the same transaction.
    pub fn award(
        recipient: &str,
        amount: &Amount,
        desc: &[u8],
        block_height: i64,
        timestamp: i64,
    ) -> Result<Self, TransactionError> {
        if recipient.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "award recipient can not be empty".to_string(),
            ));
        }
        if amount.is_zero() {
            return Err(TransactionError::InvalidTransaction(format!(
                "award amount for {} must be positive",
                recipient
            )));
        }
        let timestamp = Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .ok_or(TransactionError::InvalidTimestamp(timestamp))?;

        let mut tx = Self {
            version: TX_VERSION,
            id: String::new(),
            outputs: vec![TransactionOutput {
                amount: amount.to_str_radix(10),
                recipient: recipient.to_string(),
            }],
            timestamp,
            block_height,
            is_award: true,
            desc: desc.to_vec(),
        };
        tx.id = tx.calculate_hash();
        Ok(tx)
    }

    /// Calculate the transaction hash
    pub fn calculate_hash(&self) -> String {
        let data = format!(
            "{}{:?}{}{}{}{}",
            self.version,
            self.outputs,
            self.timestamp.timestamp(),
            self.block_height,
            self.is_award,
            hex::encode(&self.desc)
        );
        hex::encode(sha256(data.as_bytes()))
    }

    /// Get total output amount
    pub fn total_output(&self) -> Amount {
        self.outputs
            .iter()
            .filter_map(|o| Amount::parse_bytes(o.amount.as_bytes(), 10))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_transaction() {
        let tx = Transaction::award("alice", &Amount::from(5u32), AWARD_MARKER, 10, 1_700_000_000)
            .unwrap();

        assert!(tx.is_award);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].amount, "5");
        assert_eq!(tx.outputs[0].recipient, "alice");
        assert_eq!(tx.desc, b"1");
        assert_eq!(tx.total_output(), Amount::from(5u32));
        assert_eq!(tx.id, tx.calculate_hash());
    }

    #[test]
    fn test_award_is_deterministic() {
        let a = Transaction::award("bob", &Amount::from(7u32), AWARD_MARKER, 3, 1_000).unwrap();
        let b = Transaction::award("bob", &Amount::from(7u32), AWARD_MARKER, 3, 1_000).unwrap();
        let c = Transaction::award("bob", &Amount::from(7u32), AWARD_MARKER, 4, 1_000).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn test_award_rejects_bad_input() {
        assert!(Transaction::award("", &Amount::from(1u32), AWARD_MARKER, 1, 0).is_err());
        assert!(Transaction::award("alice", &Amount::zero(), AWARD_MARKER, 1, 0).is_err());
    }
}

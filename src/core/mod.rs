//! Core node types shared with the engine's collaborators
//!
//! This module contains:
//! - Invocation requests and responses exchanged with the contract layer
//! - Read/write set entries produced by contract execution
//! - Award transactions emitted during block production
//! - Arbitrary-precision stake amounts

pub mod amount;
pub mod request;
pub mod transaction;

pub use amount::{parse_amount, Amount};
pub use request::{
    Args, ContractResponse, InvokeRequest, InvokeResponse, InvokeRpcRequest, ResourceLimits,
    TxInput, TxOutput, UtxoOutput, MAX_GAS_LIMIT, STATUS_ERROR, STATUS_OK,
};
pub use transaction::{
    Transaction, TransactionError, TransactionOutput, AWARD_MARKER, TX_VERSION,
};

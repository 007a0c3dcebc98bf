//! Middleware engine errors

use crate::contract::VmError;
use crate::core::TransactionError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised by the registry, the interceptor and the governance engine
#[derive(Error, Debug)]
pub enum MiddlewareError {
    // Malformed input
    #[error("the name can not be empty")]
    EmptyName,
    #[error("the initiator can not be empty")]
    EmptyInitiator,
    #[error("the index is invalid, index: {0}")]
    InvalidIndex(String),
    #[error("the amount can not be parsed as a non-negative integer, the amount is: {0}")]
    InvalidAmount(String),
    #[error("the action is undefined, the action is: {0}")]
    UnknownAction(String),
    #[error("a transaction may carry only one governance request, got {0}")]
    MultipleGovernanceRequests(usize),

    // Referential
    #[error("the middleware already exists, name: {name}, index: {index}")]
    AlreadyExists { name: String, index: usize },
    #[error("the middleware not exist, name: {0}")]
    NotFound(String),
    #[error("the vote does not exist, the uuid is: {0}")]
    VoteNotFound(String),

    // Chain execution
    #[error("middle contract can not invoke in here, you must use middle command, the middle contract is: {0}")]
    GuardedContract(String),
    #[error("the middle contract invoke fail, the middle contract is: {contract},error: {message}")]
    Rejected { contract: String, message: String },

    // Infrastructure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("vm error: {0}")]
    Vm(#[from] VmError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

impl MiddlewareError {
    /// Input was malformed; nothing was touched
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::EmptyName
                | Self::EmptyInitiator
                | Self::InvalidIndex(_)
                | Self::InvalidAmount(_)
                | Self::UnknownAction(_)
                | Self::MultipleGovernanceRequests(_)
        )
    }

    /// Input referred to something absent or already present
    pub fn is_referential(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists { .. } | Self::NotFound(_) | Self::VoteNotFound(_)
        )
    }
}

/// Result type for middleware operations
pub type MiddlewareResult<T> = Result<T, MiddlewareError>;

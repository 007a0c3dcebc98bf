//! Contract invocation requests and responses
//!
//! These are the shapes the node hands to the engine when a transaction
//! carries contract calls, and the shapes returned after execution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status code of a successful contract response
pub const STATUS_OK: i32 = 200;

/// Status code used by contracts to reject a call
pub const STATUS_ERROR: i32 = 500;

/// Contract call arguments. Ordered so that hashing and iteration are
/// identical on every node.
pub type Args = BTreeMap<String, Vec<u8>>;

/// Gas ceiling applied when a request does not name one
pub const MAX_GAS_LIMIT: u64 = 10_000_000;

/// Execution limits enforced by the virtual machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub gas: u64,
}

impl ResourceLimits {
    /// The most generous limits a node grants
    pub const fn max() -> Self {
        Self { gas: MAX_GAS_LIMIT }
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::max()
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A single contract call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Virtual machine module (e.g. "wasm"), or the governance module
    pub module_name: String,
    /// Target contract
    pub contract_name: String,
    /// Target method
    pub method_name: String,
    /// Call arguments
    #[serde(default)]
    pub args: Args,
    /// Value transferred with the call, as a decimal string
    #[serde(default)]
    pub amount: String,
}

impl InvokeRequest {
    /// Create a request for `module.contract.method`
    pub fn new(module: &str, contract: &str, method: &str) -> Self {
        Self {
            module_name: module.to_string(),
            contract_name: contract.to_string(),
            method_name: method.to_string(),
            ..Default::default()
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, key: &str, value: impl Into<Vec<u8>>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    /// Set the transferred amount
    pub fn with_amount(mut self, amount: &str) -> Self {
        self.amount = amount.to_string();
        self
    }

    /// True when module, contract and method are all unset
    pub fn is_blank(&self) -> bool {
        self.module_name.is_empty() && self.contract_name.is_empty() && self.method_name.is_empty()
    }
}

/// The contract-call part of a transaction: the calls plus the identity
/// they run under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeRpcRequest {
    /// Calls carried by the transaction, in order
    pub requests: Vec<InvokeRequest>,
    /// Address that initiated the transaction
    pub initiator: String,
    /// Identities whose signatures authorize the transaction
    #[serde(default)]
    pub auth_require: Vec<String>,
    /// Id of the enclosing transaction, if already known
    #[serde(default)]
    pub tx_id: String,
    /// Limits every call of this request runs under
    #[serde(default)]
    pub resource_limits: ResourceLimits,
}

impl InvokeRpcRequest {
    /// Create a request from `initiator` carrying a single call
    pub fn single(initiator: &str, request: InvokeRequest) -> Self {
        Self {
            requests: vec![request],
            initiator: initiator.to_string(),
            auth_require: vec![initiator.to_string()],
            tx_id: String::new(),
            resource_limits: ResourceLimits::max(),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Result of invoking one contract method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractResponse {
    pub status: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl ContractResponse {
    /// Successful response carrying `body`
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: STATUS_OK,
            message: String::new(),
            body: body.into(),
        }
    }

    /// Application-level failure
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR,
            message: message.into(),
            body: Vec::new(),
        }
    }

    /// Status 400 and above signals rejection
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// A key read during execution, with the version it was read at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub bucket: String,
    pub key: Vec<u8>,
    /// Hex digest of the value observed, empty if the key was absent
    pub version: String,
}

/// A key written during execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub bucket: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A value transfer requested by a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    pub from: String,
    pub to: String,
    /// Decimal amount
    pub amount: String,
}

/// Response to an invocation, carrying everything the caller needs to
/// finalize the enclosing transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub response: Vec<Vec<u8>>,
    pub responses: Vec<ContractResponse>,
    pub utxo_outputs: Vec<UtxoOutput>,
}

impl InvokeResponse {
    /// Plain status response with a text body
    pub fn text(body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self {
            responses: vec![ContractResponse::ok(body)],
            ..Default::default()
        }
    }

    /// Body of the first contract response as UTF-8
    pub fn body_text(&self) -> String {
        self.responses
            .first()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .unwrap_or_default()
    }
}

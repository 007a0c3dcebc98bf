//! Virtual machine seam
//!
//! The engine never executes contract code itself. It asks a
//! [`VirtualMachine`] for an execution [`Context`] bound to one contract and
//! invokes named methods on it. A [`VmManager`] maps module names
//! (e.g. "wasm") to the machine that serves them.

use crate::contract::model::ModelCache;
use crate::core::{Args, ContractResponse, ResourceLimits};
use crate::storage::StorageError;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Gas schedule
// =============================================================================

/// Gas charged for entering a method
pub const CALL_GAS: u64 = 700;

/// Gas cost for storage write
pub const SSTORE_GAS: u64 = 5000;

/// Gas cost for storage read (charged per entry on scans)
pub const SLOAD_GAS: u64 = 200;

/// Gas cost for a value transfer
pub const TRANSFER_GAS: u64 = 2300;

// =============================================================================
// VM Errors
// =============================================================================

/// VM errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("contract {0} not found")]
    ContractNotFound(String),
    #[error("module {0} not found")]
    ModuleNotFound(String),
    #[error("method {method} not found in contract {contract}")]
    MethodNotFound { contract: String, method: String },
    #[error("out of gas: limit {0}")]
    OutOfGas(u64),
    #[error("contract already exists: {0}")]
    AlreadyExists(String),
    #[error("deployment failed: {0}")]
    DeploymentFailed(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for VmError {
    fn from(err: StorageError) -> Self {
        VmError::Storage(err.to_string())
    }
}

impl VmError {
    /// True when the target contract simply is not deployed
    pub fn is_not_installed(&self) -> bool {
        matches!(self, VmError::ContractNotFound(_))
    }
}

// =============================================================================
// Contexts
// =============================================================================

/// Everything a context needs to know about who is calling what
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Contract the context is bound to
    pub contract_name: String,
    /// Caller identity
    pub initiator: String,
    /// Identities that signed for the caller
    pub auth_require: Vec<String>,
    /// Limits enforced while the context runs
    pub resource_limits: ResourceLimits,
}

impl ContextConfig {
    /// Create a config for `contract_name` called by `initiator`
    pub fn new(contract_name: &str, initiator: &str, auth_require: &[String]) -> Self {
        Self {
            contract_name: contract_name.to_string(),
            initiator: initiator.to_string(),
            auth_require: auth_require.to_vec(),
            resource_limits: ResourceLimits::max(),
        }
    }

    /// Replace the resource limits
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.resource_limits = limits;
        self
    }
}

/// A live execution context bound to one contract.
///
/// Dropping the context releases it.
pub trait Context {
    /// Invoke `method` with `args`
    fn invoke(&mut self, method: &str, args: &Args) -> Result<ContractResponse, VmError>;

    /// Gas consumed so far
    fn gas_used(&self) -> u64;
}

/// A contract virtual machine
pub trait VirtualMachine: Send + Sync {
    /// Module name this machine serves
    fn name(&self) -> &str;

    /// Create a context for `config.contract_name`. Reads and writes made
    /// through the context land in `cache`; nothing reaches the base store.
    ///
    /// Returns [`VmError::ContractNotFound`] if the contract is not deployed.
    fn new_context<'a>(
        &'a self,
        config: &ContextConfig,
        cache: &'a mut ModelCache,
    ) -> Result<Box<dyn Context + 'a>, VmError>;
}

/// Registry of virtual machines by module name
#[derive(Default, Clone)]
pub struct VmManager {
    vms: BTreeMap<String, Arc<dyn VirtualMachine>>,
}

impl VmManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a machine under its module name
    pub fn register(&mut self, vm: Arc<dyn VirtualMachine>) {
        self.vms.insert(vm.name().to_string(), vm);
    }

    /// Look up the machine serving `module`
    pub fn get_vm(&self, module: &str) -> Result<Arc<dyn VirtualMachine>, VmError> {
        self.vms
            .get(module)
            .cloned()
            .ok_or_else(|| VmError::ModuleNotFound(module.to_string()))
    }
}

/// Meters gas for one context
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// Create a meter with `limit` gas available
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Consume gas, failing once the limit would be exceeded
    pub fn consume(&mut self, amount: u64) -> Result<(), VmError> {
        let used = self.used.saturating_add(amount);
        if used > self.limit {
            self.used = self.limit;
            return Err(VmError::OutOfGas(self.limit));
        }
        self.used = used;
        Ok(())
    }

    /// Gas consumed so far
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Gas left
    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_meter() {
        let mut meter = GasMeter::new(1000);
        meter.consume(SLOAD_GAS).unwrap();
        assert_eq!(meter.used(), 200);
        assert_eq!(meter.remaining(), 800);

        assert_eq!(meter.consume(SSTORE_GAS), Err(VmError::OutOfGas(1000)));
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_not_installed() {
        assert!(VmError::ContractNotFound("a".into()).is_not_installed());
        assert!(!VmError::ModuleNotFound("wasm".into()).is_not_installed());
        assert!(!VmError::OutOfGas(1).is_not_installed());
    }

    #[test]
    fn test_missing_module() {
        let manager = VmManager::new();
        assert!(matches!(
            manager.get_vm("wasm"),
            Err(VmError::ModuleNotFound(m)) if m == "wasm"
        ));
    }
}

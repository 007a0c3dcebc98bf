//! Native contract virtual machine
//!
//! Hosts contracts written in Rust behind the [`VirtualMachine`] seam.
//! Each contract's state lives in its own bucket of the base store, named
//! after the contract.

use crate::contract::model::{commit_outputs, ModelCache};
use crate::contract::vm::{
    Context, ContextConfig, GasMeter, VirtualMachine, VmError, CALL_GAS, SLOAD_GAS, SSTORE_GAS,
    TRANSFER_GAS,
};
use crate::core::{Args, ContractResponse};
use crate::storage::KvStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Method run once when a contract is deployed
pub const INITIALIZE_METHOD: &str = "initialize";

/// Method reporting the contract version
pub const VERSION_METHOD: &str = "version";

/// A contract implemented in Rust.
///
/// Unknown methods should return [`VmError::MethodNotFound`] through
/// [`CallContext::method_not_found`].
pub trait NativeContract: Send + Sync {
    /// Dispatch `method`
    fn call(&self, method: &str, ctx: &mut CallContext<'_>) -> Result<ContractResponse, VmError>;
}

/// What a running contract can see and touch
pub struct CallContext<'a> {
    config: &'a ContextConfig,
    args: &'a Args,
    cache: &'a mut ModelCache,
    gas: &'a mut GasMeter,
}

impl<'a> CallContext<'a> {
    /// Call arguments
    pub fn args(&self) -> &Args {
        self.args
    }

    /// Argument `key`, if present
    pub fn arg(&self, key: &str) -> Option<&[u8]> {
        self.args.get(key).map(|v| v.as_slice())
    }

    /// Caller identity
    pub fn initiator(&self) -> &str {
        &self.config.initiator
    }

    /// Contract being executed
    pub fn contract_name(&self) -> &str {
        &self.config.contract_name
    }

    /// Read from the contract's own state
    pub fn get_object(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, VmError> {
        self.gas.consume(SLOAD_GAS)?;
        Ok(self.cache.get(&self.config.contract_name, key)?)
    }

    /// Write to the contract's own state
    pub fn put_object(&mut self, key: &[u8], value: &[u8]) -> Result<(), VmError> {
        self.gas.consume(SSTORE_GAS)?;
        self.cache.put(&self.config.contract_name, key, value);
        Ok(())
    }

    /// All entries whose key starts with `prefix`
    pub fn scan_prefix(&mut self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, VmError> {
        let entries = self.cache.scan_prefix(&self.config.contract_name, prefix)?;
        self.gas
            .consume(SLOAD_GAS.saturating_mul(entries.len().max(1) as u64))?;
        Ok(entries)
    }

    /// Transfer `amount` from the caller to `to`
    pub fn transfer(&mut self, to: &str, amount: &str) -> Result<(), VmError> {
        self.gas.consume(TRANSFER_GAS)?;
        self.cache.transfer(&self.config.initiator, to, amount);
        Ok(())
    }

    /// Error for an unsupported method
    pub fn method_not_found(&self, method: &str) -> VmError {
        VmError::MethodNotFound {
            contract: self.config.contract_name.clone(),
            method: method.to_string(),
        }
    }
}

/// Context handed out by [`NativeVm`]
struct NativeContext<'a> {
    contract: Arc<dyn NativeContract>,
    config: ContextConfig,
    cache: &'a mut ModelCache,
    gas: GasMeter,
}

impl<'a> Context for NativeContext<'a> {
    fn invoke(&mut self, method: &str, args: &Args) -> Result<ContractResponse, VmError> {
        self.gas.consume(CALL_GAS)?;
        let mut call = CallContext {
            config: &self.config,
            args,
            cache: &mut *self.cache,
            gas: &mut self.gas,
        };
        self.contract.call(method, &mut call)
    }

    fn gas_used(&self) -> u64 {
        self.gas.used()
    }
}

/// Virtual machine running [`NativeContract`]s
pub struct NativeVm {
    name: String,
    store: Arc<dyn KvStore>,
    contracts: RwLock<BTreeMap<String, Arc<dyn NativeContract>>>,
}

impl NativeVm {
    /// Create a machine serving `module` over `store`
    pub fn new(module: &str, store: Arc<dyn KvStore>) -> Self {
        Self {
            name: module.to_string(),
            store,
            contracts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Deploy `contract` as `name`, running its initialize method as
    /// `deployer` and committing the resulting state.
    pub fn deploy(
        &self,
        name: &str,
        contract: Arc<dyn NativeContract>,
        deployer: &str,
        args: &Args,
    ) -> Result<ContractResponse, VmError> {
        if self.is_installed(name) {
            return Err(VmError::AlreadyExists(name.to_string()));
        }

        let config = ContextConfig::new(name, deployer, &[deployer.to_string()]);
        let mut cache = ModelCache::new(self.store.clone());
        let response = {
            let mut ctx = NativeContext {
                contract: contract.clone(),
                config,
                cache: &mut cache,
                gas: GasMeter::new(crate::core::MAX_GAS_LIMIT),
            };
            ctx.invoke(INITIALIZE_METHOD, args)?
        };
        if response.is_error() {
            return Err(VmError::DeploymentFailed(format!(
                "{}: {}",
                name, response.message
            )));
        }

        let (_, outputs) = cache.rw_sets();
        commit_outputs(self.store.as_ref(), &outputs)?;
        self.contracts.write().insert(name.to_string(), contract);

        log::info!("Contract {} deployed on {}", name, self.name);
        Ok(response)
    }

    /// Version string reported by contract `name`
    pub fn version(&self, name: &str) -> Result<String, VmError> {
        let config = ContextConfig::new(name, "", &[]);
        let mut cache = ModelCache::new(self.store.clone());
        let mut ctx = self.new_context(&config, &mut cache)?;
        let response = ctx.invoke(VERSION_METHOD, &Args::new())?;
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }

    /// Check whether `name` is deployed
    pub fn is_installed(&self, name: &str) -> bool {
        self.contracts.read().contains_key(name)
    }

    /// Names of all deployed contracts
    pub fn list(&self) -> Vec<String> {
        self.contracts.read().keys().cloned().collect()
    }
}

impl VirtualMachine for NativeVm {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_context<'a>(
        &'a self,
        config: &ContextConfig,
        cache: &'a mut ModelCache,
    ) -> Result<Box<dyn Context + 'a>, VmError> {
        let contract = self
            .contracts
            .read()
            .get(&config.contract_name)
            .cloned()
            .ok_or_else(|| VmError::ContractNotFound(config.contract_name.clone()))?;

        Ok(Box::new(NativeContext {
            contract,
            gas: GasMeter::new(config.resource_limits.gas),
            config: config.clone(),
            cache,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceLimits;
    use crate::storage::MemoryStore;

    /// Counts calls in its own state
    struct Counter;

    impl NativeContract for Counter {
        fn call(
            &self,
            method: &str,
            ctx: &mut CallContext<'_>,
        ) -> Result<ContractResponse, VmError> {
            match method {
                INITIALIZE_METHOD => {
                    ctx.put_object(b"count", b"0")?;
                    Ok(ContractResponse::ok("initialized"))
                }
                VERSION_METHOD => Ok(ContractResponse::ok("2.1")),
                "bump" => {
                    let current = ctx.get_object(b"count")?.unwrap_or_default();
                    let next = String::from_utf8_lossy(&current)
                        .parse::<u64>()
                        .unwrap_or(0)
                        + 1;
                    ctx.put_object(b"count", next.to_string().as_bytes())?;
                    Ok(ContractResponse::ok(next.to_string()))
                }
                "pay" => {
                    ctx.transfer("bob", "3")?;
                    Ok(ContractResponse::ok(ctx.initiator().to_string()))
                }
                other => Err(ctx.method_not_found(other)),
            }
        }
    }

    fn vm() -> (Arc<MemoryStore>, NativeVm) {
        let store = Arc::new(MemoryStore::new());
        let vm = NativeVm::new("wasm", store.clone());
        vm.deploy("counter", Arc::new(Counter), "deployer", &Args::new())
            .unwrap();
        (store, vm)
    }

    #[test]
    fn test_deploy_commits_initialize_state() {
        let (store, vm) = vm();
        assert!(vm.is_installed("counter"));
        assert_eq!(
            store
                .get(&crate::contract::model::bucket_key("counter", b"count"))
                .unwrap(),
            Some(b"0".to_vec())
        );
        assert_eq!(vm.version("counter").unwrap(), "2.1");

        let again = vm.deploy("counter", Arc::new(Counter), "deployer", &Args::new());
        assert!(matches!(again, Err(VmError::AlreadyExists(_))));
    }

    #[test]
    fn test_invoke_buffers_writes() {
        let (store, vm) = vm();
        let mut cache = ModelCache::new(store.clone());
        let config = ContextConfig::new("counter", "alice", &["alice".to_string()]);

        {
            let mut ctx = vm.new_context(&config, &mut cache).unwrap();
            assert_eq!(ctx.invoke("bump", &Args::new()).unwrap().body, b"1");
            assert_eq!(ctx.invoke("bump", &Args::new()).unwrap().body, b"2");
            assert!(ctx.gas_used() > 0);
        }

        let (_, outputs) = cache.rw_sets();
        assert_eq!(outputs[0].value, b"2");
        // Base store still holds the deployed value
        assert_eq!(
            store
                .get(&crate::contract::model::bucket_key("counter", b"count"))
                .unwrap(),
            Some(b"0".to_vec())
        );
    }

    #[test]
    fn test_unknown_contract_and_method() {
        let (store, vm) = vm();
        let mut cache = ModelCache::new(store);

        let missing = ContextConfig::new("nope", "alice", &[]);
        assert!(matches!(
            vm.new_context(&missing, &mut cache),
            Err(VmError::ContractNotFound(_))
        ));

        let config = ContextConfig::new("counter", "alice", &[]);
        let mut ctx = vm.new_context(&config, &mut cache).unwrap();
        assert!(matches!(
            ctx.invoke("explode", &Args::new()),
            Err(VmError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_gas_limit_enforced() {
        let (store, vm) = vm();
        let mut cache = ModelCache::new(store);
        let config = ContextConfig::new("counter", "alice", &[])
            .with_limits(ResourceLimits { gas: CALL_GAS + SLOAD_GAS });

        let mut ctx = vm.new_context(&config, &mut cache).unwrap();
        assert!(matches!(
            ctx.invoke("bump", &Args::new()),
            Err(VmError::OutOfGas(_))
        ));
    }

    #[test]
    fn test_transfer_uses_initiator() {
        let (store, vm) = vm();
        let mut cache = ModelCache::new(store);
        let config = ContextConfig::new("counter", "alice", &[]);

        {
            let mut ctx = vm.new_context(&config, &mut cache).unwrap();
            assert_eq!(ctx.invoke("pay", &Args::new()).unwrap().body, b"alice");
        }
        let transfers = cache.utxo_outputs();
        assert_eq!(transfers[0].from, "alice");
        assert_eq!(transfers[0].to, "bob");
    }
}

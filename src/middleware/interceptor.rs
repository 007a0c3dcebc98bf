//! Invocation interceptor
//!
//! Routes ordinary contract calls through every registered middleware
//! contract, in registry order, before the call is admitted. The first
//! middleware that fails stops the chain and rejects the whole request.

use crate::contract::{ContextConfig, ModelCache, VmManager};
use crate::core::{InvokeRequest, InvokeRpcRequest};
use crate::middleware::error::{MiddlewareError, MiddlewareResult};
use crate::storage::KvStore;
use log::{debug, warn};
use std::sync::Arc;

/// Runs requests through a middleware chain
pub struct Interceptor {
    vms: Arc<VmManager>,
    store: Arc<dyn KvStore>,
    module: String,
    entry_point: String,
}

impl Interceptor {
    /// Create an interceptor for calls to `module`, invoking
    /// `entry_point` on each middleware
    pub fn new(vms: Arc<VmManager>, store: Arc<dyn KvStore>, module: &str, entry_point: &str) -> Self {
        Self {
            vms,
            store,
            module: module.to_string(),
            entry_point: entry_point.to_string(),
        }
    }

    /// True if `request` must pass through the chain
    pub fn applies_to(&self, request: &InvokeRequest) -> bool {
        !request.is_blank() && request.module_name == self.module
    }

    /// Run every applicable call of `rpc` through `chain`.
    ///
    /// Middleware state changes are never committed: all contexts share
    /// one scratch cache that is discarded afterwards.
    pub fn run(&self, chain: &[String], rpc: &InvokeRpcRequest) -> MiddlewareResult<()> {
        let mut cache = ModelCache::new(self.store.clone());

        for request in rpc.requests.iter().filter(|r| self.applies_to(r)) {
            // Registry members are only reachable through governance
            if let Some(member) = chain.iter().find(|m| **m == request.contract_name) {
                return Err(MiddlewareError::GuardedContract(member.clone()));
            }

            let vm = self.vms.get_vm(&request.module_name)?;

            for middleware in chain {
                let config = ContextConfig::new(middleware, &rpc.initiator, &rpc.auth_require)
                    .with_limits(rpc.resource_limits);

                let mut ctx = match vm.new_context(&config, &mut cache) {
                    Ok(ctx) => ctx,
                    Err(err) if err.is_not_installed() => {
                        debug!("Middleware {} not installed, skipping", middleware);
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                };

                let response = ctx.invoke(&self.entry_point, &request.args)?;
                debug!(
                    "Middleware {} checked {}.{} (status {}, gas {})",
                    middleware,
                    request.contract_name,
                    request.method_name,
                    response.status,
                    ctx.gas_used()
                );
                drop(ctx);

                if response.is_error() {
                    warn!(
                        "Middleware {} rejected call to {}.{}: {}",
                        middleware, request.contract_name, request.method_name, response.message
                    );
                    return Err(MiddlewareError::Rejected {
                        contract: middleware.clone(),
                        message: response.message,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{CallContext, NativeContract, NativeVm, VmError};
    use crate::core::{Args, ContractResponse};
    use crate::storage::MemoryStore;
    use parking_lot::Mutex;

    /// Records every call, answers with a fixed status
    struct Recorder {
        status: i32,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl NativeContract for Recorder {
        fn call(
            &self,
            method: &str,
            ctx: &mut CallContext<'_>,
        ) -> Result<ContractResponse, VmError> {
            if method != "middleware" {
                return Ok(ContractResponse::ok(Vec::<u8>::new()));
            }
            self.log
                .lock()
                .push(format!("{}:{}", ctx.contract_name(), ctx.initiator()));
            // Scratch writes must never reach the base store
            ctx.put_object(b"seen", b"1")?;
            Ok(ContractResponse {
                status: self.status,
                message: format!("{} says {}", ctx.contract_name(), self.status),
                body: Vec::new(),
            })
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        interceptor: Interceptor,
        log: Arc<Mutex<Vec<String>>>,
    }

    fn fixture(contracts: &[(&str, i32)]) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let vm = NativeVm::new("wasm", store.clone());
        for (name, status) in contracts {
            let recorder = Recorder {
                status: *status,
                log: log.clone(),
            };
            vm.deploy(name, Arc::new(recorder), "admin", &Args::new()).unwrap();
        }
        let mut vms = VmManager::new();
        vms.register(Arc::new(vm));

        Fixture {
            interceptor: Interceptor::new(Arc::new(vms), store.clone(), "wasm", "middleware"),
            store,
            log,
        }
    }

    fn chain(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn call(contract: &str) -> InvokeRpcRequest {
        InvokeRpcRequest::single(
            "alice",
            InvokeRequest::new("wasm", contract, "transfer").with_arg("to", "bob"),
        )
    }

    #[test]
    fn test_chain_runs_in_order() {
        let f = fixture(&[("a", 200), ("b", 200)]);
        let store_before = f.store.snapshot();

        f.interceptor.run(&chain(&["b", "a"]), &call("token")).unwrap();

        assert_eq!(*f.log.lock(), vec!["b:alice", "a:alice"]);
        assert_eq!(f.store.snapshot(), store_before);
    }

    #[test]
    fn test_chain_stops_at_first_rejection() {
        let f = fixture(&[("a", 200), ("b", 400), ("c", 200)]);

        let err = f
            .interceptor
            .run(&chain(&["a", "b", "c"]), &call("token"))
            .unwrap_err();

        match err {
            MiddlewareError::Rejected { contract, message } => {
                assert_eq!(contract, "b");
                assert_eq!(message, "b says 400");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(*f.log.lock(), vec!["a:alice", "b:alice"]);
    }

    #[test]
    fn test_missing_middleware_is_skipped() {
        let f = fixture(&[("a", 200)]);
        f.interceptor
            .run(&chain(&["ghost", "a"]), &call("token"))
            .unwrap();
        assert_eq!(*f.log.lock(), vec!["a:alice"]);
    }

    #[test]
    fn test_registry_members_are_guarded() {
        let f = fixture(&[("a", 200)]);

        let err = f.interceptor.run(&chain(&["a"]), &call("a")).unwrap_err();
        assert!(matches!(err, MiddlewareError::GuardedContract(name) if name == "a"));

        // Guarded even when the member is not installed
        let err = f.interceptor.run(&chain(&["ghost"]), &call("ghost")).unwrap_err();
        assert!(matches!(err, MiddlewareError::GuardedContract(_)));
        assert!(f.log.lock().is_empty());
    }

    #[test]
    fn test_other_modules_pass_through() {
        let f = fixture(&[("a", 500)]);

        let native = InvokeRpcRequest::single("alice", InvokeRequest::new("native", "a", "run"));
        f.interceptor.run(&chain(&["a"]), &native).unwrap();

        let blank = InvokeRpcRequest::single("alice", InvokeRequest::default());
        f.interceptor.run(&chain(&["a"]), &blank).unwrap();

        assert!(f.log.lock().is_empty());
    }

    #[test]
    fn test_unknown_module_is_fatal() {
        let f = fixture(&[]);
        let interceptor = Interceptor::new(Arc::new(VmManager::new()), f.store.clone(), "wasm", "middleware");

        let err = interceptor.run(&chain(&["a"]), &call("token")).unwrap_err();
        assert!(matches!(err, MiddlewareError::Vm(VmError::ModuleNotFound(_))));
    }

    #[test]
    fn test_every_call_is_checked() {
        let f = fixture(&[("a", 200)]);
        let mut rpc = call("token");
        rpc.requests.push(InvokeRequest::new("wasm", "other", "run"));

        f.interceptor.run(&chain(&["a"]), &rpc).unwrap();
        assert_eq!(f.log.lock().len(), 2);
    }
}

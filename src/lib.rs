//! Middle-Chain: stake-governed contract middleware in Rust
//!
//! This crate provides the middleware layer of a contract chain:
//! - An ordered registry of middleware contracts, persisted in the base store
//! - Interception of every ordinary contract call through that registry
//! - Stake-weighted proposals to change the registry or invoke a contract
//!   with elevated rights
//! - Refund of voting stake as award transactions at block production
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use middle_chain::config::MiddlewareConfig;
//! use middle_chain::contract::{NativeVm, TextFilter, VmManager, TEXT_FILTER};
//! use middle_chain::core::{Args, InvokeRequest, InvokeRpcRequest};
//! use middle_chain::middleware::MiddlewareEngine;
//! use middle_chain::storage::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let vm = NativeVm::new("wasm", store.clone());
//! vm.deploy(TEXT_FILTER, Arc::new(TextFilter), "genesis", &Args::new()).unwrap();
//! let mut vms = VmManager::new();
//! vms.register(Arc::new(vm));
//!
//! let engine = MiddlewareEngine::new(MiddlewareConfig::default(), store, vms).unwrap();
//!
//! // An ordinary call passes through text_filter before it is admitted
//! let call = InvokeRpcRequest::single(
//!     "alice",
//!     InvokeRequest::new("wasm", "token", "transfer").with_arg("memo", "hello"),
//! );
//! engine.intercept(&call).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod contract;
pub mod core;
pub mod crypto;
pub mod middleware;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigError, MiddlewareConfig};
pub use contract::{NativeContract, NativeVm, VirtualMachine, VmError, VmManager};
pub use core::{Amount, InvokeRequest, InvokeResponse, InvokeRpcRequest, Transaction};
pub use middleware::{MiddlewareEngine, MiddlewareError, MiddlewareRegistry};
pub use storage::{FileStore, KvStore, MemoryStore, StorageError};

//! Contract execution module
//!
//! Provides the virtual machine seam the middleware engine runs contracts
//! through, plus an in-process machine for contracts written in Rust.
//!
//! # Overview
//!
//! This module implements:
//! - The [`VirtualMachine`] / [`Context`] traits and a [`VmManager`]
//! - A [`ModelCache`] that buffers reads and writes into read/write sets
//! - [`NativeVm`], hosting [`NativeContract`]s with gas metering
//! - The built-in `text_filter` middleware and `crud` contracts
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use middle_chain::contract::{Crud, NativeVm};
//! use middle_chain::core::Args;
//! use middle_chain::storage::MemoryStore;
//!
//! let vm = NativeVm::new("wasm", Arc::new(MemoryStore::new()));
//! vm.deploy("crud", Arc::new(Crud), "deployer", &Args::new()).unwrap();
//! assert_eq!(vm.version("crud").unwrap(), "1.0");
//! ```

pub mod builtin;
pub mod model;
pub mod native;
pub mod vm;

pub use builtin::{Crud, TextFilter, MIDDLEWARE_METHOD, TEXT_FILTER};
pub use model::{bucket_key, commit_outputs, ModelCache};
pub use native::{CallContext, NativeContract, NativeVm, INITIALIZE_METHOD, VERSION_METHOD};
pub use vm::{
    Context, ContextConfig, GasMeter, VirtualMachine, VmError, VmManager, CALL_GAS, SLOAD_GAS,
    SSTORE_GAS, TRANSFER_GAS,
};

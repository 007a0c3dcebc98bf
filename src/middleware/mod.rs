//! Middleware governance
//!
//! A stake-voted registry of middleware contracts that every ordinary
//! contract call is routed through before it is admitted.
//!
//! # Overview
//!
//! - [`MiddlewareRegistry`]: the ordered, persisted list of middleware names
//! - [`Interceptor`]: runs a call through the chain, stopping at the first
//!   rejection
//! - [`GovernanceRequest`] / [`Proposal`]: registry changes and privileged
//!   invocations, executed once enough stake has voted for them
//! - [`RefundLedger`]: stake owed back to voters, paid out as award
//!   transactions at block production
//! - [`MiddlewareEngine`]: ties the above together
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use middle_chain::config::MiddlewareConfig;
//! use middle_chain::contract::VmManager;
//! use middle_chain::core::{InvokeRequest, InvokeRpcRequest};
//! use middle_chain::middleware::{MiddlewareEngine, ARG_ACTION};
//! use middle_chain::storage::MemoryStore;
//!
//! let engine = MiddlewareEngine::new(
//!     MiddlewareConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     VmManager::new(),
//! )
//! .unwrap();
//!
//! let get = InvokeRpcRequest::single(
//!     "alice",
//!     InvokeRequest::new("middle", "", "").with_arg(ARG_ACTION, "get"),
//! );
//! let response = engine.manage(&get).unwrap().unwrap();
//! assert_eq!(response.body_text(), r#"["text_filter"]"#);
//! ```

pub mod engine;
pub mod error;
pub mod interceptor;
pub mod proposal;
pub mod refund;
pub mod registry;

pub use engine::MiddlewareEngine;
pub use error::{MiddlewareError, MiddlewareResult};
pub use interceptor::Interceptor;
pub use proposal::{
    Action, GovernanceRequest, Proposal, Vote, ARG_ACTION, ARG_AMOUNT, ARG_CONTRACT, ARG_INDEX,
    ARG_METHOD, ARG_MODULE, ARG_NAME, ARG_UUID,
};
pub use refund::RefundLedger;
pub use registry::MiddlewareRegistry;

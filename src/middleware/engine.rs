//! Middleware engine
//!
//! Ties the registry, the interceptor, the proposal pool and the refund
//! ledger together behind the three entry points a node calls: governance
//! requests go to [`MiddlewareEngine::manage`], ordinary contract calls to
//! [`MiddlewareEngine::intercept`], and block production drains refunds
//! through [`MiddlewareEngine::autogen_txs`].
//!
//! Locking: governance work holds the admin lock for the whole request and
//! takes the registry write lock inside it. Interception holds its own lock
//! and only reads a snapshot of the registry, so the two never wait on each
//! other for long.

use crate::config::MiddlewareConfig;
use crate::contract::{ContextConfig, ModelCache, VmManager};
use crate::core::{Amount, InvokeRequest, InvokeResponse, InvokeRpcRequest, Transaction};
use crate::middleware::error::{MiddlewareError, MiddlewareResult};
use crate::middleware::interceptor::Interceptor;
use crate::middleware::proposal::{Action, GovernanceRequest, Proposal};
use crate::middleware::refund::RefundLedger;
use crate::middleware::registry::MiddlewareRegistry;
use crate::storage::KvStore;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// State guarded by the admin lock
#[derive(Default)]
struct GovernanceState {
    pool: BTreeMap<String, Proposal>,
    refunds: RefundLedger,
}

/// The middleware governance engine
pub struct MiddlewareEngine {
    config: MiddlewareConfig,
    store: Arc<dyn KvStore>,
    vms: Arc<VmManager>,
    registry: RwLock<MiddlewareRegistry>,
    interceptor: Interceptor,
    admin: Mutex<GovernanceState>,
    interception: Mutex<()>,
}

impl MiddlewareEngine {
    /// Create an engine over `store`, loading the persisted registry or
    /// seeding it from the configured defaults.
    pub fn new(
        config: MiddlewareConfig,
        store: Arc<dyn KvStore>,
        vms: VmManager,
    ) -> MiddlewareResult<Self> {
        let registry = MiddlewareRegistry::load(
            store.as_ref(),
            &config.registry_key,
            &config.default_middlewares,
        )?;
        let vms = Arc::new(vms);
        let interceptor = Interceptor::new(
            vms.clone(),
            store.clone(),
            &config.intercepted_module,
            &config.entry_point,
        );

        info!(
            "Middleware engine ready: {} (governance module {}, threshold {})",
            registry.list(),
            config.governance_module,
            config.pass_threshold
        );

        Ok(Self {
            config,
            store,
            vms,
            registry: RwLock::new(registry),
            interceptor,
            admin: Mutex::new(GovernanceState::default()),
            interception: Mutex::new(()),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &MiddlewareConfig {
        &self.config
    }

    /// Serialized registry, e.g. `["text_filter"]`
    pub fn list(&self) -> String {
        self.registry.read().list()
    }

    /// Registered middleware names, in execution order
    pub fn middlewares(&self) -> Vec<String> {
        self.registry.read().names().to_vec()
    }

    /// True if `request` is addressed to the governance module
    pub fn is_governance(&self, request: &InvokeRequest) -> bool {
        request.module_name == self.config.governance_module
    }

    // =========================================================================
    // Interception
    // =========================================================================

    /// Run every intercepted call of `rpc` through the middleware chain.
    ///
    /// Returns `Ok(())` if the request may proceed.
    pub fn intercept(&self, rpc: &InvokeRpcRequest) -> MiddlewareResult<()> {
        let _guard = self.interception.lock();
        let chain = self.middlewares();
        self.interceptor.run(&chain, rpc)
    }

    // =========================================================================
    // Governance
    // =========================================================================

    /// Handle a governance request.
    ///
    /// Returns `Ok(None)` if `rpc` carries no governance call, so the caller
    /// can treat it as an ordinary transaction.
    pub fn manage(&self, rpc: &InvokeRpcRequest) -> MiddlewareResult<Option<InvokeResponse>> {
        let calls: Vec<&InvokeRequest> = rpc
            .requests
            .iter()
            .filter(|r| self.is_governance(r))
            .collect();

        let call = match calls.as_slice() {
            [] => return Ok(None),
            [call] => *call,
            _ => return Err(MiddlewareError::MultipleGovernanceRequests(calls.len())),
        };

        let request = GovernanceRequest::parse(rpc, call)?;
        debug!(
            "Governance request {} from {} (stake {})",
            request.action, request.vote.address, request.vote.amount
        );

        if request.action == Action::Get {
            return Ok(Some(InvokeResponse::text(self.list())));
        }

        self.submit(request).map(Some)
    }

    /// Open, vote on, or execute a proposal
    fn submit(&self, request: GovernanceRequest) -> MiddlewareResult<InvokeResponse> {
        let mut state = self.admin.lock();
        let id = request.proposal_id()?;

        let proposal = match state.pool.get_mut(&id) {
            None if request.action == Action::Vote => {
                return Err(MiddlewareError::VoteNotFound(id));
            }
            None => {
                let proposal =
                    Proposal::open(id.clone(), request, self.config.pass_threshold.clone());
                let status = proposal.status();
                info!("Proposal {} opened: {} {}", id, proposal.action, proposal.name);
                state.pool.insert(id, proposal);
                return Ok(InvokeResponse::text(status));
            }
            Some(proposal) => {
                proposal.add_vote(request.vote);
                if !proposal.is_passed() {
                    debug!("Proposal {} voted: {}", id, proposal.status());
                    return Ok(InvokeResponse::text(proposal.status()));
                }
                proposal.clone()
            }
        };

        // Passed: stake is owed back whatever the outcome of execution
        for vote in &proposal.votes {
            state.refunds.credit(&vote.address, &vote.amount);
        }
        state.pool.remove(&id);
        info!(
            "Proposal {} passed with {} of {}, executing {}",
            id, proposal.vote_count, proposal.pass_count, proposal.action
        );

        let result = self.execute(&proposal);
        if let Err(err) = &result {
            warn!("Proposal {} failed to execute: {}", id, err);
        }
        result
    }

    /// Apply a passed proposal
    fn execute(&self, proposal: &Proposal) -> MiddlewareResult<InvokeResponse> {
        match proposal.action {
            Action::Put => {
                let list = self.registry.write().insert(
                    self.store.as_ref(),
                    &proposal.name,
                    &proposal.index,
                )?;
                Ok(InvokeResponse::text(format!(
                    "execution put, middle contract: {}, index: {}, middle list: {}",
                    proposal.name, proposal.index, list
                )))
            }
            Action::Swap => {
                let list = self.registry.write().reorder(
                    self.store.as_ref(),
                    &proposal.name,
                    &proposal.index,
                )?;
                Ok(InvokeResponse::text(format!(
                    "execution swap, middle contract: {}, index: {}, middle list: {}",
                    proposal.name, proposal.index, list
                )))
            }
            Action::Del => {
                let list = self
                    .registry
                    .write()
                    .remove(self.store.as_ref(), &proposal.name)?;
                Ok(InvokeResponse::text(format!(
                    "execution del, middle contract: {}, middle list: {}",
                    proposal.name, list
                )))
            }
            Action::Invoke => self.invoke(proposal),
            Action::Get | Action::Vote => Err(MiddlewareError::UnknownAction(
                proposal.action.to_string(),
            )),
        }
    }

    /// Invoke the proposal's target with the proposer's identity, bypassing
    /// the middleware chain and the registry guard.
    fn invoke(&self, proposal: &Proposal) -> MiddlewareResult<InvokeResponse> {
        let vm = self.vms.get_vm(&proposal.module)?;
        let config = ContextConfig::new(
            &proposal.contract,
            &proposal.origin.address,
            &proposal.origin.auth,
        );
        let mut cache = ModelCache::new(self.store.clone());

        let response = {
            let mut ctx = vm.new_context(&config, &mut cache)?;
            let response = ctx.invoke(&proposal.method, &proposal.args)?;
            debug!(
                "Privileged call {}.{} used {} gas",
                proposal.contract,
                proposal.method,
                ctx.gas_used()
            );
            response
        };

        if response.is_error() {
            return Err(MiddlewareError::Rejected {
                contract: proposal.contract.clone(),
                message: response.message,
            });
        }

        let (inputs, outputs) = cache.rw_sets();
        info!(
            "Privileged call {}.{} executed, {} writes",
            proposal.contract,
            proposal.method,
            outputs.len()
        );

        Ok(InvokeResponse {
            inputs,
            outputs,
            response: vec![response.body.clone()],
            utxo_outputs: cache.utxo_outputs(),
            responses: vec![response],
        })
    }

    /// Pending proposal under `id`
    pub fn proposal(&self, id: &str) -> Option<Proposal> {
        self.admin.lock().pool.get(id).cloned()
    }

    /// Number of pending proposals
    pub fn pending_proposals(&self) -> usize {
        self.admin.lock().pool.len()
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// Refund currently owed to `address`
    pub fn pending_refund(&self, address: &str) -> Amount {
        self.admin.lock().refunds.pending(address)
    }

    /// Drain the refund ledger into award transactions for the block at
    /// `block_height`.
    ///
    /// `max_count` is advisory: the ledger is always drained entirely.
    pub fn autogen_txs(
        &self,
        block_height: i64,
        max_count: usize,
        timestamp: i64,
    ) -> MiddlewareResult<Vec<Transaction>> {
        let mut state = self.admin.lock();
        if state.refunds.is_empty() {
            return Ok(Vec::new());
        }

        let txs = state.refunds.drain(
            self.config.award_marker.as_bytes(),
            block_height,
            timestamp,
        )?;
        if txs.len() > max_count {
            warn!(
                "Emitting {} refund transactions, more than the {} requested",
                txs.len(),
                max_count
            );
        }
        info!("Generated {} refund transactions at height {}", txs.len(), block_height);
        Ok(txs)
    }
}

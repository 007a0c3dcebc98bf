//! CLI commands for the middleware node
//!
//! Implements the command handlers behind `middled`.

use crate::config::MiddlewareConfig;
use crate::contract::{commit_outputs, Crud, NativeVm, TextFilter, VmManager, TEXT_FILTER};
use crate::core::{Args, InvokeRequest, InvokeRpcRequest, ResourceLimits};
use crate::middleware::MiddlewareEngine;
use crate::storage::{FileStore, StorageConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Identity the built-in contracts are deployed as
const BUILTIN_DEPLOYER: &str = "genesis";

/// Application state
pub struct AppState {
    pub engine: MiddlewareEngine,
    pub store: Arc<FileStore>,
    pub vm: Arc<NativeVm>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the data directory and start an engine over it
    pub fn new(data_dir: PathBuf, config_path: Option<&Path>) -> CliResult<Self> {
        let config = match config_path {
            Some(path) => MiddlewareConfig::load(path)?,
            None => MiddlewareConfig::default(),
        };

        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };
        let store = Arc::new(FileStore::open(storage_config)?);

        let vm = Arc::new(NativeVm::new(&config.intercepted_module, store.clone()));
        vm.deploy(TEXT_FILTER, Arc::new(TextFilter), BUILTIN_DEPLOYER, &Args::new())?;
        vm.deploy("crud", Arc::new(Crud), BUILTIN_DEPLOYER, &Args::new())?;

        let mut vms = VmManager::new();
        vms.register(vm.clone());

        let engine = MiddlewareEngine::new(config, store.clone(), vms)?;

        Ok(Self {
            engine,
            store,
            vm,
            data_dir,
        })
    }
}

/// A contract call as written in a replay file. Argument values are text.
#[derive(Debug, Deserialize)]
pub struct StepCall {
    pub module_name: String,
    #[serde(default)]
    pub contract_name: String,
    #[serde(default)]
    pub method_name: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    #[serde(default)]
    pub amount: String,
}

/// A transaction's calls as written in a replay file
#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub requests: Vec<StepCall>,
    pub initiator: String,
    #[serde(default)]
    pub auth_require: Vec<String>,
    #[serde(default)]
    pub tx_id: String,
}

impl From<StepRequest> for InvokeRpcRequest {
    fn from(step: StepRequest) -> Self {
        let requests = step
            .requests
            .into_iter()
            .map(|call| InvokeRequest {
                module_name: call.module_name,
                contract_name: call.contract_name,
                method_name: call.method_name,
                args: call
                    .args
                    .into_iter()
                    .map(|(k, v)| (k, v.into_bytes()))
                    .collect(),
                amount: call.amount,
            })
            .collect();

        let auth_require = if step.auth_require.is_empty() {
            vec![step.initiator.clone()]
        } else {
            step.auth_require
        };

        InvokeRpcRequest {
            requests,
            initiator: step.initiator,
            auth_require,
            tx_id: step.tx_id,
            resource_limits: ResourceLimits::max(),
        }
    }
}

/// Block production parameters
#[derive(Debug, Deserialize)]
pub struct ProduceStep {
    pub height: i64,
    #[serde(default = "default_max_count")]
    pub max_count: usize,
    pub timestamp: i64,
}

fn default_max_count() -> usize {
    1000
}

/// One entry of a replay file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Submit a governance request
    Govern(StepRequest),
    /// Run an ordinary call through the middleware chain
    Invoke(StepRequest),
    /// Produce a block, draining refunds
    Produce(ProduceStep),
}

/// Load a replay file
pub fn load_steps(path: &Path) -> CliResult<Vec<Step>> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Show the middleware registry
pub fn cmd_list(state: &AppState) -> CliResult<()> {
    let names = state.engine.middlewares();

    println!("🧩 Middleware registry ({} entries)", names.len());
    for (index, name) in names.iter().enumerate() {
        let installed = if state.vm.is_installed(name) {
            "installed"
        } else {
            "not installed"
        };
        println!("   {} | {} | {}", index, name, installed);
    }
    println!("   {}", state.engine.list());

    Ok(())
}

/// Replay a history of governance requests, calls and blocks
pub fn cmd_replay(state: &AppState, path: &Path) -> CliResult<()> {
    let steps = load_steps(path)?;
    println!("▶️  Replaying {} step(s) from {:?}", steps.len(), path);

    for (number, step) in steps.into_iter().enumerate() {
        match step {
            Step::Govern(request) => {
                let rpc = InvokeRpcRequest::from(request);
                match state.engine.manage(&rpc) {
                    Ok(Some(response)) => {
                        // Privileged invocations hand back a write set to apply
                        commit_outputs(state.store.as_ref(), &response.outputs)?;
                        println!("   #{} govern ✅ {}", number, response.body_text());
                    }
                    Ok(None) => println!("   #{} govern ⏭️  no governance call", number),
                    Err(err) => println!("   #{} govern ❌ {}", number, err),
                }
            }
            Step::Invoke(request) => {
                let rpc = InvokeRpcRequest::from(request);
                match state.engine.intercept(&rpc) {
                    Ok(()) => println!("   #{} invoke ✅ admitted", number),
                    Err(err) => println!("   #{} invoke ❌ {}", number, err),
                }
            }
            Step::Produce(block) => {
                let txs = state
                    .engine
                    .autogen_txs(block.height, block.max_count, block.timestamp)?;
                println!(
                    "   #{} produce 🧱 height {}: {} refund tx(s)",
                    number,
                    block.height,
                    txs.len()
                );
                for tx in &txs {
                    for output in &tx.outputs {
                        println!("      └─ {} receives {} ({})", output.recipient, output.amount, &tx.id[..16]);
                    }
                }
            }
        }
    }

    println!("\n🧩 Registry: {}", state.engine.list());
    println!("   Pending proposals: {}", state.engine.pending_proposals());
    let stats = state.store.stats()?;
    println!(
        "   Store: {} keys, {} bytes in {:?}",
        stats.key_count, stats.file_size, stats.data_dir
    );

    Ok(())
}
